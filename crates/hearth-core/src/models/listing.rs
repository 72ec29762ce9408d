//! Listing model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::user::UserId;

/// Maximum number of images attached to a listing.
pub const MAX_LISTING_IMAGES: usize = 6;

/// Store-assigned listing identifier.
///
/// Opaque to the core: stores mint them, callers only pass them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Mint a new time-sortable identifier (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an identifier issued by a store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the property is offered for sale or for rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
}

impl ListingType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }

    /// Heading label, e.g. "For Rent".
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sale => "For Sale",
            Self::Rent => "For Rent",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(Self::Sale),
            "rent" => Ok(Self::Rent),
            other => Err(Error::InvalidInput(format!(
                "Unknown listing category: {other}"
            ))),
        }
    }
}

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both coordinates are finite and inside the valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Listing document fields written by the submission pipeline.
///
/// `discounted_price` is omitted from the serialized document when the
/// listing is not on offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ListingData {
    #[serde(rename = "type")]
    pub kind: ListingType,
    pub name: String,
    /// Free-text address as entered by the owner.
    pub location: String,
    pub geolocation: GeoPoint,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub parking: bool,
    pub furnished: bool,
    pub offer: bool,
    pub regular_price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<u64>,
    /// Ordered image URLs; the first one is the cover.
    pub image_urls: Vec<String>,
    pub owner_ref: UserId,
}

impl ListingData {
    /// Check the document invariants.
    pub fn check_invariants(&self) -> Result<()> {
        match (self.offer, self.discounted_price) {
            (true, Some(discounted)) if discounted >= self.regular_price => {
                return Err(Error::Validation(
                    "Discounted price must be lower than the regular price".to_string(),
                ));
            }
            (true, None) => {
                return Err(Error::Validation(
                    "Offer listings need a discounted price".to_string(),
                ));
            }
            (false, Some(_)) => {
                return Err(Error::Validation(
                    "Discounted price is only allowed on offers".to_string(),
                ));
            }
            _ => {}
        }

        if self.image_urls.is_empty() || self.image_urls.len() > MAX_LISTING_IMAGES {
            return Err(Error::Validation(format!(
                "A listing needs between 1 and {MAX_LISTING_IMAGES} images"
            )));
        }
        if self.bedrooms == 0 || self.bathrooms == 0 {
            return Err(Error::Validation(
                "Bedrooms and bathrooms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Price a buyer or tenant pays: the discounted price when on offer.
    pub fn effective_price(&self) -> u64 {
        match (self.offer, self.discounted_price) {
            (true, Some(discounted)) => discounted,
            _ => self.regular_price,
        }
    }

    /// Amount saved on an offer, if any.
    pub fn discount_amount(&self) -> Option<u64> {
        if !self.offer {
            return None;
        }
        self.discounted_price
            .map(|discounted| self.regular_price.saturating_sub(discounted))
    }

    /// Display price such as `$1,250 / Month`.
    pub fn price_label(&self) -> String {
        let price = format_price(self.effective_price());
        match self.kind {
            ListingType::Rent => format!("${price} / Month"),
            ListingType::Sale => format!("${price}"),
        }
    }

    /// Cover image, the first URL.
    pub fn cover_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

/// A persisted listing as returned by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    #[serde(flatten)]
    pub data: ListingData,
    /// Server-assigned write timestamp (Unix ms).
    pub created_at: i64,
}

impl Listing {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.data.owner_ref == user
    }
}

/// Format a whole price with thousands separators, e.g. `1234567` → `1,234,567`.
pub fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
