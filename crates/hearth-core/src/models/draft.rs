//! Editable listing form state

use std::fmt;

use super::listing::{GeoPoint, Listing, ListingType};

/// A local image picked in the listing form, not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name as picked by the user.
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Content type reported by the picker, if any.
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub const fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("size_bytes", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Mutable form state for creating or editing a listing.
///
/// Holds form-only fields (`new_images`, `manual_geolocation`) that never
/// reach the persisted document.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ListingDraft {
    pub kind: ListingType,
    pub name: String,
    pub address: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub parking: bool,
    pub furnished: bool,
    pub offer: bool,
    pub regular_price: u64,
    pub discounted_price: Option<u64>,
    /// Coordinates typed in by hand; only read when geolocation is disabled.
    pub manual_geolocation: Option<GeoPoint>,
    pub new_images: Vec<ImageUpload>,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self {
            kind: ListingType::Rent,
            name: String::new(),
            address: String::new(),
            bedrooms: 1,
            bathrooms: 1,
            parking: false,
            furnished: false,
            offer: false,
            regular_price: 0,
            discounted_price: None,
            manual_geolocation: None,
            new_images: Vec::new(),
        }
    }
}

impl ListingDraft {
    /// Prefill a draft from a persisted listing for the edit form.
    ///
    /// Returns the draft and the listing's current image URLs.
    pub fn from_listing(listing: &Listing) -> (Self, Vec<String>) {
        let data = &listing.data;
        let draft = Self {
            kind: data.kind,
            name: data.name.clone(),
            address: data.location.clone(),
            bedrooms: data.bedrooms,
            bathrooms: data.bathrooms,
            parking: data.parking,
            furnished: data.furnished,
            offer: data.offer,
            regular_price: data.regular_price,
            discounted_price: data.discounted_price,
            manual_geolocation: Some(data.geolocation),
            new_images: Vec::new(),
        };
        (draft, data.image_urls.clone())
    }

    /// Total images the listing would carry after submit.
    pub fn total_images(&self, existing_image_urls: &[String]) -> usize {
        self.new_images.len() + existing_image_urls.len()
    }
}

/// Remove an already-uploaded image from the edit form.
///
/// Idempotent; the remote blob is left in place.
pub fn remove_image_url(existing_image_urls: &[String], url: &str) -> Vec<String> {
    existing_image_urls
        .iter()
        .filter(|candidate| candidate.as_str() != url)
        .cloned()
        .collect()
}
