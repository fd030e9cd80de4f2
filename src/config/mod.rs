//! Configuration management for the store locator
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawler configuration
    pub crawler: CrawlerConfig,

    /// Geocoding provider configuration
    pub geocoder: GeocoderConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crawler-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Root page of the store directory
    pub start_url: String,

    /// Hosts the crawler may follow links to (empty allows any host)
    pub allowed_domains: Vec<String>,

    /// Maximum number of concurrent requests
    pub max_concurrent_requests: usize,

    /// Rate limit (requests per second)
    pub rate_limit: f64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retry attempts for transient fetch failures
    pub max_retries: u32,

    /// Fixed user agent string (rotated browser agents when unset)
    pub user_agent: Option<String>,
}

/// Geocoding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Base URL of the Nominatim-compatible service
    pub base_url: String,

    /// User agent identifying this application to the provider
    pub user_agent: String,

    /// Per-lookup timeout in seconds
    pub timeout_secs: u64,

    /// Retry attempts for transient provider errors
    pub max_retries: u32,

    /// Wait between retries in seconds
    pub error_wait_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: String::from("https://restaurants.ihop.com/"),
            allowed_domains: vec![String::from("restaurants.ihop.com")],
            max_concurrent_requests: 16,
            rate_limit: 8.0,
            request_timeout_secs: 30,
            max_retries: 2,
            user_agent: None,
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://nominatim.openstreetmap.org"),
            user_agent: format!("store-locator/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 1,
            max_retries: 2,
            error_wait_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            geocoder: GeocoderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables keep their default values.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Overlay environment variables onto this configuration
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("STORE_LOCATOR_START_URL") {
            self.crawler.start_url = url;
        }

        if let Some(rate) = env_parse::<f64>("STORE_LOCATOR_RATE_LIMIT") {
            self.crawler.rate_limit = rate;
        }

        if let Some(n) = env_parse::<usize>("STORE_LOCATOR_MAX_CONCURRENT_REQUESTS") {
            self.crawler.max_concurrent_requests = n;
        }

        if let Some(secs) = env_parse::<u64>("STORE_LOCATOR_REQUEST_TIMEOUT") {
            self.crawler.request_timeout_secs = secs;
        }

        if let Ok(agent) = std::env::var("STORE_LOCATOR_USER_AGENT") {
            self.crawler.user_agent = Some(agent);
        }

        if let Ok(url) = std::env::var("STORE_LOCATOR_GEOCODER_URL") {
            self.geocoder.base_url = url;
        }

        if let Ok(level) = std::env::var("STORE_LOCATOR_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending setting
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.crawler.max_concurrent_requests == 0 {
            return Err(Error::config("max_concurrent_requests must be greater than 0"));
        }

        if !(self.crawler.rate_limit > 0.0 && self.crawler.rate_limit.is_finite()) {
            return Err(Error::config("rate_limit must be a positive number"));
        }

        Url::parse(&self.crawler.start_url).map_err(|e| {
            Error::config(format!("Invalid start_url {}: {e}", self.crawler.start_url))
        })?;

        Url::parse(&self.geocoder.base_url).map_err(|e| {
            Error::config(format!(
                "Invalid geocoder base_url {}: {e}",
                self.geocoder.base_url
            ))
        })?;

        if self.geocoder.user_agent.trim().is_empty() {
            return Err(Error::config("geocoder user_agent must not be empty"));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }

    /// Get geocoder lookup timeout as Duration
    #[must_use]
    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder.timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
