//! hearth-core - Core library for Hearth
//!
//! This crate contains the listing models, store abstractions, paginated
//! queries, and the listing submission pipeline shared by every Hearth
//! client.

pub mod config;
pub mod db;
pub mod error;
pub mod geocode;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod store;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use models::{Listing, ListingData, ListingDraft, ListingId, ListingType, UserId};
pub use pagination::{CountStrategy, ListingPaginator, Page, PaginatorState};
pub use pipeline::{ListingSubmissionPipeline, SubmitMode};
pub use services::MarketplaceService;
