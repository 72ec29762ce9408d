//! Service layer shared by every client surface.

mod marketplace;

pub use marketplace::MarketplaceService;
