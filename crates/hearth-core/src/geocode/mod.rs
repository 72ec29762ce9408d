//! Forward geocoding of free-text addresses.

use std::time::Duration;

use serde::Deserialize;

use crate::config::GeocodeConfig;
use crate::models::GeoPoint;
use crate::util::{compact_text, is_http_url};
use crate::{Error, Result};

/// Default positionstack forward-geocoding endpoint.
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "http://api.positionstack.com/v1/forward";

const GEOCODE_HTTP_TIMEOUT_SECS: u64 = 10;

/// Resolves an address to candidate coordinates, best match first.
///
/// An empty vector means the address matched nothing.
#[allow(async_fn_in_trait)]
pub trait GeocodeResolver {
    async fn resolve(&self, address: &str) -> Result<Vec<GeoPoint>>;
}

/// positionstack HTTP client.
#[derive(Clone)]
pub struct PositionstackGeocoder {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for PositionstackGeocoder {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PositionstackGeocoder")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PositionstackGeocoder {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        if !is_http_url(&endpoint) {
            return Err(Error::InvalidInput(
                "Geocode endpoint must include http:// or https://".to_string(),
            ));
        }

        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::InvalidInput(
                "Geocode API key must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GEOCODE_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|error| Error::Geocode(format!("Failed to construct HTTP client: {error}")))?;

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }

    pub fn from_config(config: &GeocodeConfig) -> Result<Self> {
        Self::new(config.endpoint.as_str(), config.api_key.as_str())
    }
}

impl GeocodeResolver for PositionstackGeocoder {
    async fn resolve(&self, address: &str) -> Result<Vec<GeoPoint>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("query", address),
                ("limit", "1"),
            ])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| {
                Error::Geocode(format!("Geocode request failed: {}", error.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Geocode(format!(
                "Geocode request failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|error| {
                Error::Geocode(format!(
                    "Failed to read geocode response: {}",
                    error.without_url()
                ))
            })?;
        let matches = parse_forward_response(&body)?;

        tracing::debug!(matches = matches.len(), "Geocoded address");
        Ok(matches)
    }
}

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<ForwardError>,
}

#[derive(Debug, Deserialize)]
struct ForwardError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForwardMatch {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Parse a positionstack forward response.
///
/// The service answers an unmatched query with `data: []` (and occasionally
/// `data: {}`), both of which mean "no match".
fn parse_forward_response(body: &str) -> Result<Vec<GeoPoint>> {
    let payload: ForwardResponse = serde_json::from_str(body)
        .map_err(|error| Error::Geocode(format!("Invalid geocode response: {error}")))?;

    if let Some(error) = payload.error {
        return Err(Error::Geocode(
            error
                .message
                .unwrap_or_else(|| "geocoder returned an error".to_string()),
        ));
    }

    let Some(serde_json::Value::Array(items)) = payload.data else {
        return Ok(Vec::new());
    };

    let mut points = Vec::with_capacity(items.len());
    for item in items {
        let candidate: ForwardMatch = serde_json::from_value(item)
            .map_err(|error| Error::Geocode(format!("Invalid geocode match: {error}")))?;
        if let (Some(lat), Some(lng)) = (candidate.latitude, candidate.longitude) {
            let point = GeoPoint::new(lat, lng);
            if point.is_valid() {
                points.push(point);
            }
        }
    }
    Ok(points)
}
