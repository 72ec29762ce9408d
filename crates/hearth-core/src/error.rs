//! Error types for hearth-core

use thiserror::Error;

/// Result type alias using hearth-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hearth-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Draft rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Geocoder returned no match for the address
    #[error("Address not found: {0}")]
    AddressNotFound(String),

    /// Geocoder request failed
    #[error("Geocoding error: {0}")]
    Geocode(String),

    /// One or more image uploads failed
    #[error("Upload error: {0}")]
    Upload(String),

    /// Listing document write failed
    #[error("Persist error: {0}")]
    Persist(String),

    /// Current user does not own the listing
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Listing query failed
    #[error("Query error: {0}")]
    Query(String),

    /// `load_next_page` called with no further pages available
    #[error("No further pages to load")]
    PaginationExhausted,

    /// Listing or profile not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Media/object storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Human-readable message category shown to end users.
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Please check the listing details and try again.",
            Self::AddressNotFound(_) => "Please enter a valid address.",
            Self::Geocode(_) => "Could not look up the address.",
            Self::Upload(_) => "Could not upload images.",
            Self::Persist(_) => "Could not save listing.",
            Self::Authorization(_) => "You cannot edit that listing.",
            Self::Query(_) | Self::PaginationExhausted => "Could not fetch listings.",
            Self::NotFound(_) => "Listing does not exist.",
            Self::InvalidInput(_) => "Invalid configuration.",
            Self::LibSql(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Storage(_) => "Something went wrong.",
        }
    }

    /// Whether a caller may retry the same call unchanged.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Query(_) | Self::Geocode(_) | Self::Upload(_) | Self::Persist(_)
        )
    }
}
