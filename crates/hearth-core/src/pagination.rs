//! Cursor-based listing pagination with exhaustion detection.
//!
//! The store has no reliable "is there another page" signal, so after every
//! page the paginator compares how many listings it has fetched so far with
//! the total number of matching listings. Only while fetched < total does it
//! keep a cursor and report `has_more`.

use std::fmt;
use std::str::FromStr;

use crate::models::Listing;
use crate::store::{ListingFilter, ListingQuery, ListingStore, PageCursor};
use crate::{Error, Result};

/// How the paginator learns the total number of matching listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountStrategy {
    /// Re-run the query without a limit and count the rows.
    #[default]
    FullScan,
    /// Ask the store for an aggregate count, scanning only if it has none.
    Aggregate,
}

impl FromStr for CountStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full_scan" | "full-scan" | "scan" => Ok(Self::FullScan),
            "aggregate" | "count" => Ok(Self::Aggregate),
            other => Err(Error::InvalidInput(format!(
                "Unknown count strategy: {other}"
            ))),
        }
    }
}

/// Paginator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorState {
    Idle,
    Loading,
    Ready { has_more: bool },
}

/// Outcome of one page load.
#[derive(Debug, Clone)]
pub struct Page {
    /// Listings fetched by this call only.
    pub listings: Vec<Listing>,
    pub has_more: bool,
}

/// Forward-only paginator over one filter, newest first.
pub struct ListingPaginator<S> {
    store: S,
    filter: ListingFilter,
    page_size: usize,
    count_strategy: CountStrategy,
    state: PaginatorState,
    listings: Vec<Listing>,
    cursor: Option<PageCursor>,
}

impl<S> fmt::Debug for ListingPaginator<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ListingPaginator")
            .field("filter", &self.filter)
            .field("page_size", &self.page_size)
            .field("count_strategy", &self.count_strategy)
            .field("state", &self.state)
            .field("fetched", &self.listings.len())
            .finish_non_exhaustive()
    }
}

impl<S: ListingStore> ListingPaginator<S> {
    pub fn new(store: S, filter: ListingFilter, page_size: usize) -> Self {
        Self {
            store,
            filter,
            page_size: page_size.max(1),
            count_strategy: CountStrategy::default(),
            state: PaginatorState::Idle,
            listings: Vec::new(),
            cursor: None,
        }
    }

    #[must_use]
    pub const fn with_count_strategy(mut self, count_strategy: CountStrategy) -> Self {
        self.count_strategy = count_strategy;
        self
    }

    pub const fn state(&self) -> PaginatorState {
        self.state
    }

    pub const fn filter(&self) -> &ListingFilter {
        &self.filter
    }

    /// Every listing fetched so far, in page order.
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub const fn has_more(&self) -> bool {
        matches!(self.state, PaginatorState::Ready { has_more: true })
    }

    /// Discard cursor and fetched listings.
    pub fn reset(&mut self) {
        self.state = PaginatorState::Idle;
        self.listings.clear();
        self.cursor = None;
    }

    /// Switch to another filter; resets only when the filter actually changes.
    pub fn set_filter(&mut self, filter: ListingFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.reset();
        }
    }

    /// Load the first page for `filter`, replacing anything fetched before.
    pub async fn load_first_page(&mut self, filter: ListingFilter, page_size: usize) -> Result<Page> {
        self.set_filter(filter);
        self.page_size = page_size.max(1);

        let query = ListingQuery::new(self.filter.clone()).limit(self.page_size);
        self.load(query, 0).await
    }

    /// Load the page after the stored cursor and append it.
    pub async fn load_next_page(&mut self) -> Result<Page> {
        let cursor = match (&self.state, &self.cursor) {
            (PaginatorState::Ready { has_more: true }, Some(cursor)) => cursor.clone(),
            _ => return Err(Error::PaginationExhausted),
        };

        let query = ListingQuery::new(self.filter.clone())
            .limit(self.page_size)
            .start_after(cursor);
        let already_fetched = self.listings.len();
        self.load(query, already_fetched).await
    }

    async fn load(&mut self, query: ListingQuery, already_fetched: usize) -> Result<Page> {
        let previous = self.state;
        self.state = PaginatorState::Loading;

        match self.fetch(&query, already_fetched).await {
            Ok((page, cursor)) => {
                if already_fetched == 0 {
                    self.listings.clear();
                }
                self.listings.extend(page.listings.iter().cloned());
                self.cursor = cursor;
                self.state = PaginatorState::Ready {
                    has_more: page.has_more,
                };
                Ok(page)
            }
            Err(error) => {
                self.state = previous;
                tracing::warn!(filter = %self.filter, "Listing page fetch failed: {error}");
                Err(error)
            }
        }
    }

    /// Fetch a page and decide exhaustion without touching paginator state.
    async fn fetch(
        &self,
        query: &ListingQuery,
        already_fetched: usize,
    ) -> Result<(Page, Option<PageCursor>)> {
        let result = self
            .store
            .query(query)
            .await
            .map_err(|error| Error::Query(error.to_string()))?;

        let fetched = already_fetched + result.listings.len();
        let total = self.total_matching().await?;
        let has_more = !result.listings.is_empty() && fetched < total;

        tracing::debug!(
            filter = %self.filter,
            page = result.listings.len(),
            fetched,
            total,
            has_more,
            "Fetched listing page"
        );

        let cursor = if has_more { result.last_cursor } else { None };
        Ok((
            Page {
                listings: result.listings,
                has_more,
            },
            cursor,
        ))
    }

    async fn total_matching(&self) -> Result<usize> {
        if self.count_strategy == CountStrategy::Aggregate {
            match self.store.count(&self.filter).await {
                Ok(Some(total)) => return Ok(total),
                Ok(None) => {
                    tracing::debug!("Store has no aggregate count; falling back to a full scan");
                }
                Err(error) => return Err(Error::Query(error.to_string())),
            }
        }

        let everything = self
            .store
            .query(&ListingQuery::new(self.filter.clone()))
            .await
            .map_err(|error| Error::Query(error.to_string()))?;
        Ok(everything.listings.len())
    }
}
