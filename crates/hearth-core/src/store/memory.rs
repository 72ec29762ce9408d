//! In-process listing store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{Listing, ListingData, ListingId, UserId, UserProfile};
use crate::util::unix_timestamp_millis;
use crate::{Error, Result};

use super::{ListingFilter, ListingQuery, ListingStore, PageCursor, ProfileStore, QueryPage};

/// Thread-safe in-memory store, cheap to clone.
///
/// Timestamps are strictly increasing across writes, matching a server clock.
#[derive(Clone, Default)]
pub struct MemoryListingStore {
    inner: Arc<Mutex<Inner>>,
    without_aggregates: bool,
}

#[derive(Default)]
struct Inner {
    listings: Vec<Listing>,
    profiles: HashMap<UserId, UserProfile>,
    last_timestamp: i64,
}

impl Inner {
    fn next_timestamp(&mut self) -> i64 {
        let now = unix_timestamp_millis().max(self.last_timestamp + 1);
        self.last_timestamp = now;
        now
    }
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report no aggregate count support, like a plain document store.
    #[must_use]
    pub const fn without_aggregate_count(mut self) -> Self {
        self.without_aggregates = true;
        self
    }

    /// Number of stored listings.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.listings.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn sorted_matches(listings: &[Listing], filter: &ListingFilter) -> Vec<Listing> {
        let mut matches: Vec<Listing> = listings
            .iter()
            .filter(|listing| filter.matches(&listing.data))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        matches
    }
}

impl ListingStore for MemoryListingStore {
    async fn query(&self, query: &ListingQuery) -> Result<QueryPage> {
        let start_after = query
            .start_after
            .as_ref()
            .map(PageCursor::position)
            .transpose()?;

        let inner = self.inner.lock().await;
        let matches = Self::sorted_matches(&inner.listings, &query.filter);

        let listings: Vec<Listing> = matches
            .into_iter()
            .filter(|listing| {
                start_after.as_ref().map_or(true, |(created_at, id)| {
                    (listing.created_at, listing.id.as_str()) < (*created_at, id.as_str())
                })
            })
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        let last_cursor = listings.last().map(PageCursor::at);
        Ok(QueryPage {
            listings,
            last_cursor,
        })
    }

    async fn count(&self, filter: &ListingFilter) -> Result<Option<usize>> {
        if self.without_aggregates {
            return Ok(None);
        }
        let inner = self.inner.lock().await;
        Ok(Some(
            inner
                .listings
                .iter()
                .filter(|listing| filter.matches(&listing.data))
                .count(),
        ))
    }

    async fn get(&self, id: &ListingId) -> Result<Option<Listing>> {
        let inner = self.inner.lock().await;
        Ok(inner.listings.iter().find(|listing| &listing.id == id).cloned())
    }

    async fn create(&self, data: ListingData) -> Result<ListingId> {
        let mut inner = self.inner.lock().await;
        let id = ListingId::generate();
        let created_at = inner.next_timestamp();
        inner.listings.push(Listing {
            id: id.clone(),
            data,
            created_at,
        });
        Ok(id)
    }

    async fn update(&self, id: &ListingId, data: ListingData) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let created_at = inner.next_timestamp();
        let listing = inner
            .listings
            .iter_mut()
            .find(|listing| &listing.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let owner_ref = listing.data.owner_ref.clone();
        listing.data = ListingData { owner_ref, ..data };
        listing.created_at = created_at;
        Ok(())
    }

    async fn delete(&self, id: &ListingId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let before = inner.listings.len();
        inner.listings.retain(|listing| &listing.id != id);
        if inner.listings.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl ProfileStore for MemoryListingStore {
    async fn get_profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.inner.lock().await.profiles.get(user).cloned())
    }

    async fn save_profile(&self, user: &UserId, profile: &UserProfile) -> Result<()> {
        self.inner
            .lock()
            .await
            .profiles
            .insert(user.clone(), profile.clone());
        Ok(())
    }
}
