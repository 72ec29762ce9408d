//! Runtime configuration for the marketplace core.
//!
//! Values come from environment variables. Parsing goes through a lookup
//! closure so tests never touch the process environment.

use std::env;
use std::path::PathBuf;

use crate::db::StoreLocation;
use crate::geocode::DEFAULT_GEOCODE_ENDPOINT;
use crate::pagination::CountStrategy;
use crate::util::{is_http_url, normalize_text_option, parse_flag};
use crate::{Error, Result};

const ENV_GEOLOCATION_ENABLED: &str = "HEARTH_GEOLOCATION_ENABLED";
const ENV_GEOCODE_API_KEY: &str = "HEARTH_GEOCODE_API_KEY";
const ENV_GEOCODE_ENDPOINT: &str = "HEARTH_GEOCODE_ENDPOINT";
const ENV_PAGE_SIZE: &str = "HEARTH_PAGE_SIZE";
const ENV_RECENT_LIMIT: &str = "HEARTH_RECENT_LIMIT";
const ENV_COUNT_STRATEGY: &str = "HEARTH_COUNT_STRATEGY";
const ENV_DATABASE_URL: &str = "HEARTH_DATABASE_URL";
const ENV_DATABASE_TOKEN: &str = "HEARTH_DATABASE_TOKEN";
const ENV_DATABASE_PATH: &str = "HEARTH_DATABASE_PATH";

/// Listings per page on category, offer, and profile views.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Listings shown in the home slider.
pub const DEFAULT_RECENT_LIMIT: usize = 5;
const MAX_PAGE_SIZE: usize = 100;

/// Geocoder endpoint and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct GeocodeConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl std::fmt::Debug for GeocodeConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GeocodeConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Marketplace behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    /// When false, submissions use the draft's manual coordinates.
    pub geolocation_enabled: bool,
    /// Required when geolocation is enabled.
    pub geocode: Option<GeocodeConfig>,
    pub page_size: usize,
    pub recent_limit: usize,
    pub count_strategy: CountStrategy,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            geolocation_enabled: true,
            geocode: None,
            page_size: DEFAULT_PAGE_SIZE,
            recent_limit: DEFAULT_RECENT_LIMIT,
            count_strategy: CountStrategy::default(),
        }
    }
}

impl MarketplaceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        parse_marketplace_config(|key| env::var(key).ok())
    }
}

/// Where listing documents are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
}

impl StoreConfig {
    /// Load the store location from environment variables.
    ///
    /// A remote URL wins over a local path; a URL without a token is an error.
    pub fn from_env() -> Result<Option<Self>> {
        parse_store_config(|key| env::var(key).ok())
    }
}

fn parse_marketplace_config(lookup: impl Fn(&str) -> Option<String>) -> Result<MarketplaceConfig> {
    let read = |key: &str| normalize_text_option(lookup(key));
    let defaults = MarketplaceConfig::default();

    let geolocation_enabled = match read(ENV_GEOLOCATION_ENABLED) {
        Some(value) => parse_flag(&value).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{ENV_GEOLOCATION_ENABLED} must be true or false, got {value}"
            ))
        })?,
        None => defaults.geolocation_enabled,
    };

    let endpoint = read(ENV_GEOCODE_ENDPOINT).unwrap_or_else(|| DEFAULT_GEOCODE_ENDPOINT.to_string());
    if !is_http_url(&endpoint) {
        return Err(Error::InvalidInput(format!(
            "{ENV_GEOCODE_ENDPOINT} must include http:// or https://"
        )));
    }
    let geocode = read(ENV_GEOCODE_API_KEY).map(|api_key| GeocodeConfig {
        endpoint: endpoint.trim_end_matches('/').to_string(),
        api_key,
    });

    if geolocation_enabled && geocode.is_none() {
        return Err(Error::InvalidInput(format!(
            "{ENV_GEOCODE_API_KEY} is required while geolocation is enabled \
             (set {ENV_GEOLOCATION_ENABLED}=false to enter coordinates manually)"
        )));
    }

    let page_size = parse_count(read(ENV_PAGE_SIZE), ENV_PAGE_SIZE, defaults.page_size)?;
    let recent_limit = parse_count(read(ENV_RECENT_LIMIT), ENV_RECENT_LIMIT, defaults.recent_limit)?;

    let count_strategy = match read(ENV_COUNT_STRATEGY) {
        Some(value) => value.parse()?,
        None => defaults.count_strategy,
    };

    Ok(MarketplaceConfig {
        geolocation_enabled,
        geocode,
        page_size,
        recent_limit,
        count_strategy,
    })
}

fn parse_count(value: Option<String>, key: &str, default: usize) -> Result<usize> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<usize>() {
        Ok(count) if (1..=MAX_PAGE_SIZE).contains(&count) => Ok(count),
        _ => Err(Error::InvalidInput(format!(
            "{key} must be a number between 1 and {MAX_PAGE_SIZE}, got {value}"
        ))),
    }
}

fn parse_store_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<StoreConfig>> {
    let read = |key: &str| normalize_text_option(lookup(key));

    if let Some(url) = read(ENV_DATABASE_URL) {
        let auth_token = read(ENV_DATABASE_TOKEN).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{ENV_DATABASE_TOKEN} is required when {ENV_DATABASE_URL} is set"
            ))
        })?;
        return Ok(Some(StoreConfig {
            location: StoreLocation::Remote { url, auth_token },
        }));
    }

    Ok(read(ENV_DATABASE_PATH).map(|path| StoreConfig {
        location: StoreLocation::Local(PathBuf::from(path)),
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn marketplace_from(map: &HashMap<&str, &str>) -> Result<MarketplaceConfig> {
        parse_marketplace_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    fn store_from(map: &HashMap<&str, &str>) -> Result<Option<StoreConfig>> {
        parse_store_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn geolocation_requires_api_key() {
        let error = marketplace_from(&HashMap::new()).unwrap_err();
        assert!(error.to_string().contains(ENV_GEOCODE_API_KEY));
    }

    #[test]
    fn defaults_apply_with_api_key() {
        let config = marketplace_from(&HashMap::from([(ENV_GEOCODE_API_KEY, "key")])).unwrap();
        assert!(config.geolocation_enabled);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.recent_limit, DEFAULT_RECENT_LIMIT);
        assert_eq!(config.count_strategy, CountStrategy::FullScan);
        assert_eq!(
            config.geocode,
            Some(GeocodeConfig {
                endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
                api_key: "key".to_string(),
            })
        );
    }

    #[test]
    fn manual_geolocation_needs_no_key() {
        let config = marketplace_from(&HashMap::from([
            (ENV_GEOLOCATION_ENABLED, "false"),
            (ENV_PAGE_SIZE, "25"),
            (ENV_COUNT_STRATEGY, "aggregate"),
        ]))
        .unwrap();
        assert!(!config.geolocation_enabled);
        assert_eq!(config.geocode, None);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.count_strategy, CountStrategy::Aggregate);
    }

    #[test]
    fn rejects_invalid_values() {
        let base = [(ENV_GEOCODE_API_KEY, "key")];
        for (key, value) in [
            (ENV_GEOLOCATION_ENABLED, "sometimes"),
            (ENV_PAGE_SIZE, "0"),
            (ENV_PAGE_SIZE, "ten"),
            (ENV_RECENT_LIMIT, "1000"),
            (ENV_COUNT_STRATEGY, "guess"),
            (ENV_GEOCODE_ENDPOINT, "api.positionstack.com"),
        ] {
            let mut map = HashMap::from(base);
            map.insert(key, value);
            assert!(marketplace_from(&map).is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn store_config_prefers_remote() {
        let config = store_from(&HashMap::from([
            (ENV_DATABASE_URL, "libsql://db.turso.io"),
            (ENV_DATABASE_TOKEN, "token"),
            (ENV_DATABASE_PATH, "/tmp/hearth.db"),
        ]))
        .unwrap()
        .unwrap();
        assert!(matches!(config.location, StoreLocation::Remote { .. }));
    }

    #[test]
    fn store_config_remote_requires_token() {
        let result = store_from(&HashMap::from([(ENV_DATABASE_URL, "libsql://db.turso.io")]));
        assert!(result.is_err());
    }

    #[test]
    fn store_config_local_or_none() {
        assert!(store_from(&HashMap::new()).unwrap().is_none());
        let config = store_from(&HashMap::from([(ENV_DATABASE_PATH, "/tmp/hearth.db")]))
            .unwrap()
            .unwrap();
        assert_eq!(
            config.location,
            StoreLocation::Local(PathBuf::from("/tmp/hearth.db"))
        );
    }
}
