//! Data models for Hearth

mod draft;
pub(crate) mod listing;
mod user;

pub use draft::{remove_image_url, ImageUpload, ListingDraft};
pub use listing::{
    format_price, GeoPoint, Listing, ListingData, ListingId, ListingType, MAX_LISTING_IMAGES,
};
pub use user::{ContactLink, UserId, UserProfile};
