//! Database layer for Hearth

mod connection;
mod listing_repository;
mod migrations;

pub use connection::{Database, StoreLocation};
pub use listing_repository::LibSqlListingStore;
