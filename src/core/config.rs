//! Backend endpoints, credentials and search tuning

use std::env::VarError;
use std::time::Duration;

use crate::core::error::{Error, Result};

pub const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Environment variables read by [`ServiceConfig::from_env`]
pub const ENV_VARIABLES: [&str; 4] = [
    "ORS_API_KEY",
    "ORS_BASE_URL",
    "NOMINATIM_URL",
    "BUTTERFLY_MAP_TIMEOUT_SECS",
];

/// Where the backends live and how to talk to them
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Base URL for routing, snapping, POI and isochrone calls
    pub ors_base_url: String,

    /// Base URL for free-text place search
    pub nominatim_base_url: String,

    /// Sent as the `Authorization` header on every routing-service call
    pub api_key: Option<String>,

    /// Overall per-request timeout
    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ors_base_url: DEFAULT_ORS_BASE_URL.to_string(),
            nominatim_base_url: DEFAULT_NOMINATIM_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("butterfly-map/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by whatever is set in the environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(key) = env("ORS_API_KEY")? {
            config.api_key = Some(key);
        }
        if let Some(url) = env("ORS_BASE_URL")? {
            config.ors_base_url = url;
        }
        if let Some(url) = env("NOMINATIM_URL")? {
            config.nominatim_base_url = url;
        }
        if let Some(secs) = env("BUTTERFLY_MAP_TIMEOUT_SECS")? {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::InvalidInput(format!(
                    "BUTTERFLY_MAP_TIMEOUT_SECS must be a whole number of seconds, got '{secs}'"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Logs the effective configuration without leaking the key
    pub fn log(&self) {
        log::info!("openrouteservice: {}", self.ors_base_url);
        log::info!("nominatim: {}", self.nominatim_base_url);
        match &self.api_key {
            Some(_) => log::info!("API key: set"),
            None => log::warn!("API key: not set, routing calls will likely be rejected"),
        }
    }
}

fn env(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::InvalidInput(format!(
            "{name} value is not valid unicode"
        ))),
    }
}

/// Debounce and result limit for interactive place search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a request goes out
    pub debounce: Duration,

    /// Maximum number of candidates requested
    pub limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            limit: 8,
        }
    }
}
