use std::env;
use std::time::Duration;

use crate::{entities::Coordinates, error::Error};

pub const ROUTING_SERVICE_BASE_VAR: &str = "ROUTING_SERVICE_BASE";
pub const DEFAULT_ROUTING_SERVICE_BASE: &str = "http://127.0.0.1:8000";

#[derive(Clone, Debug)]
pub struct Config {
    pub service_base: String,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    #[tracing::instrument(name = "Config::from_env")]
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let service_base = match env::var(ROUTING_SERVICE_BASE_VAR) {
            Ok(base) => base,
            Err(env::VarError::NotPresent) => DEFAULT_ROUTING_SERVICE_BASE.into(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            service_base: service_base.trim_end_matches('/').into(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub default_center: Coordinates,
    pub default_zoom: u8,
    pub search_zoom: u8,
    /// Sessions untouched for this long are dropped by the server.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_len: 2,
            // Seoul
            default_center: Coordinates {
                lat: 37.5665,
                lon: 126.9780,
            },
            default_zoom: 13,
            search_zoom: 16,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[test]
fn session_defaults() {
    let config = SessionConfig::default();

    assert_eq!(config.debounce, Duration::from_millis(300));
    assert_eq!(config.min_query_len, 2);
    assert_eq!(config.default_zoom, 13);
    assert_eq!(config.search_zoom, 16);
    assert_eq!(config.idle_timeout, Duration::from_secs(1800));
}
