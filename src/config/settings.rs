//! Process-wide adapter settings read from the environment.

use crate::config::DEFAULT_PER_PAGE;
use crate::error::ConfigError;
use std::time::Duration;

/// Ceiling for a single outbound call (HTTP request or store query).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAGES: u64 = 10;
pub const DEFAULT_PATH_PREFIX: &str = "/keystone";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterSettings {
    /// Page size when neither the request nor the list sets one.
    pub per_page: u64,
    /// Width of the visible page-link window.
    pub max_pages: u64,
    pub timeout: Duration,
    /// Prefix of admin UI URLs used when building redirect targets.
    pub path_prefix: String,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        AdapterSettings {
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
        }
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::Validation(format!("{} must be a positive integer, got '{}'", name, v))),
        Err(_) => Ok(default),
    }
}

impl AdapterSettings {
    /// Read `ADMIN_PER_PAGE`, `ADMIN_MAX_PAGES`, `ADMIN_HTTP_TIMEOUT_SECS` and `ADMIN_PATH_PREFIX`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let prefix = std::env::var("ADMIN_PATH_PREFIX").unwrap_or_else(|_| DEFAULT_PATH_PREFIX.into());
        Ok(AdapterSettings {
            per_page: env_u64("ADMIN_PER_PAGE", DEFAULT_PER_PAGE)?,
            max_pages: env_u64("ADMIN_MAX_PAGES", DEFAULT_MAX_PAGES)?,
            timeout: Duration::from_secs(env_u64("ADMIN_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
            path_prefix: prefix.trim_end_matches('/').to_string(),
        })
    }
}
