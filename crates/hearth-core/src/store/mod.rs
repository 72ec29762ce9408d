//! Remote document store contract for listings and profiles.
//!
//! Every query is ordered by `created_at` descending with the listing id as
//! a descending tiebreak, so cursors always describe a stable position.

mod memory;

pub use memory::MemoryListingStore;

use std::fmt;

use crate::models::{Listing, ListingData, ListingId, ListingType, UserId, UserProfile};
use crate::{Error, Result};

/// Equality predicate applied before ordering and limiting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingFilter {
    /// Every listing.
    All,
    /// `type == kind`
    Type(ListingType),
    /// `offer == value`
    Offer(bool),
    /// `ownerRef == user`
    Owner(UserId),
}

impl ListingFilter {
    pub fn matches(&self, data: &ListingData) -> bool {
        match self {
            Self::All => true,
            Self::Type(kind) => data.kind == *kind,
            Self::Offer(offer) => data.offer == *offer,
            Self::Owner(owner) => &data.owner_ref == owner,
        }
    }
}

impl fmt::Display for ListingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Type(kind) => write!(f, "type == {kind}"),
            Self::Offer(offer) => write!(f, "offer == {offer}"),
            Self::Owner(owner) => write!(f, "ownerRef == {owner}"),
        }
    }
}

/// Opaque store-issued position marker ("last item returned").
#[derive(Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    /// Only stores mint cursors.
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Cursor pointing at a listing's `(created_at, id)` sort key.
    pub(crate) fn at(listing: &Listing) -> Self {
        Self::new(format!("{}:{}", listing.created_at, listing.id))
    }

    /// Decode the `(created_at, id)` sort key of a cursor minted by [`Self::at`].
    pub(crate) fn position(&self) -> Result<(i64, String)> {
        self.0
            .split_once(':')
            .and_then(|(created_at, id)| Some((created_at.parse().ok()?, id.to_string())))
            .ok_or_else(|| Error::InvalidInput("Malformed page cursor".to_string()))
    }
}

impl fmt::Debug for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PageCursor(..)")
    }
}

/// A filtered, ordered, optionally limited and resumed listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub filter: ListingFilter,
    pub limit: Option<usize>,
    pub start_after: Option<PageCursor>,
}

impl ListingQuery {
    pub const fn new(filter: ListingFilter) -> Self {
        Self {
            filter,
            limit: None,
            start_after: None,
        }
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn start_after(mut self, cursor: PageCursor) -> Self {
        self.start_after = Some(cursor);
        self
    }
}

/// Result of a listing query.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub listings: Vec<Listing>,
    /// Cursor of the last listing returned; `None` for an empty page.
    pub last_cursor: Option<PageCursor>,
}

/// Trait for listing document storage (async)
#[allow(async_fn_in_trait)]
pub trait ListingStore {
    /// Run a filtered query ordered newest first.
    async fn query(&self, query: &ListingQuery) -> Result<QueryPage>;

    /// Count matching listings, or `None` when the store has no cheap aggregate.
    async fn count(&self, filter: &ListingFilter) -> Result<Option<usize>>;

    /// Get a listing by id.
    async fn get(&self, id: &ListingId) -> Result<Option<Listing>>;

    /// Create a listing; the store assigns the id and timestamp.
    async fn create(&self, data: ListingData) -> Result<ListingId>;

    /// Replace the mutable fields of a listing and re-stamp its timestamp.
    async fn update(&self, id: &ListingId, data: ListingData) -> Result<()>;

    /// Delete a listing.
    async fn delete(&self, id: &ListingId) -> Result<()>;
}

/// Trait for user profile storage (async)
#[allow(async_fn_in_trait)]
pub trait ProfileStore {
    async fn get_profile(&self, user: &UserId) -> Result<Option<UserProfile>>;

    async fn save_profile(&self, user: &UserId, profile: &UserProfile) -> Result<()>;
}
