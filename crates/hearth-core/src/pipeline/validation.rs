//! Pre-flight draft checks. Pure: no I/O, no side effects.

use crate::models::{ListingDraft, MAX_LISTING_IMAGES};
use crate::{Error, Result};

/// Reject drafts that can never be persisted.
///
/// `geolocation_enabled` decides whether manual coordinates are required.
pub fn validate_draft(
    draft: &ListingDraft,
    existing_image_urls: &[String],
    geolocation_enabled: bool,
) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(Error::Validation("Listing name is required".to_string()));
    }
    if draft.address.trim().is_empty() {
        return Err(Error::Validation("Address is required".to_string()));
    }
    if draft.bedrooms == 0 || draft.bathrooms == 0 {
        return Err(Error::Validation(
            "Bedrooms and bathrooms must be at least 1".to_string(),
        ));
    }

    if draft.offer {
        match draft.discounted_price {
            Some(discounted) if discounted >= draft.regular_price => {
                return Err(Error::Validation(
                    "Discounted price must be smaller than regular price".to_string(),
                ));
            }
            None => {
                return Err(Error::Validation(
                    "Discounted price is required for offers".to_string(),
                ));
            }
            Some(_) => {}
        }
    }

    let total_images = draft.total_images(existing_image_urls);
    if total_images > MAX_LISTING_IMAGES {
        return Err(Error::Validation(format!(
            "Maximum {MAX_LISTING_IMAGES} images exceeded ({total_images} selected)"
        )));
    }
    if total_images == 0 {
        return Err(Error::Validation("At least 1 image required".to_string()));
    }

    if !geolocation_enabled {
        match draft.manual_geolocation {
            Some(point) if point.is_valid() => {}
            Some(_) => {
                return Err(Error::Validation(
                    "Latitude or longitude is out of range".to_string(),
                ));
            }
            None => {
                return Err(Error::Validation(
                    "Latitude and longitude are required".to_string(),
                ));
            }
        }
    }

    Ok(())
}
