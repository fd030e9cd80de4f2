//! HTTP page fetcher with rate limiting
//!
//! This module provides the HTTP fetcher for store directory pages with
//! features including:
//! - User-Agent rotation (or a fixed configured agent)
//! - Rate limiting with governor
//! - Automatic retry with exponential backoff for transient failures
//! - Final URL tracking across redirects

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client,
};
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// A fetched HTML page
#[derive(Debug, Clone)]
pub struct Page {
    /// URL the content was finally served from
    pub url: Url,
    pub html: String,
}

/// Anything that can turn a URL into page HTML
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Rate-limited HTTP fetcher for directory pages
pub struct PageFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Retry policy for transient failures
    retry: RetryConfig,

    /// Fixed user agent, rotated pool when `None`
    user_agent: Option<String>,
}

impl PageFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, 2, Duration::from_secs(30))
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum number of requests per second
    /// * `max_retries` - Maximum number of retry attempts
    /// * `timeout` - Request timeout duration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(Quota::per_second(rate), max_retries, timeout)
    }

    fn with_quota(quota: Quota, max_retries: u32, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            retry: RetryConfig::with_delays(max_retries, 500, 8_000),
            user_agent: None,
        })
    }

    /// Build a fetcher from the crawler section of the configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let quota = rate_quota(config.crawler.rate_limit);
        let mut fetcher =
            Self::with_quota(quota, config.crawler.max_retries, config.request_timeout())?;
        fetcher.user_agent = config.crawler.user_agent.clone();
        Ok(fetcher)
    }

    /// Use a fixed user agent instead of the rotated pool
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Fetch a page once, without retry
    async fn fetch_once(&self, url: &Url) -> Result<Page, FetchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url.clone())
            .headers(self.build_headers())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let final_url = response.url().clone();
        let html = response.text().await.map_err(classify)?;

        Ok(Page {
            url: final_url,
            html,
        })
    }

    /// Build HTTP headers for directory requests
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let agent = match &self.user_agent {
            Some(agent) => HeaderValue::from_str(agent).ok(),
            None => Some(HeaderValue::from_static(self.random_user_agent())),
        };
        if let Some(agent) = agent {
            headers.insert(USER_AGENT, agent);
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<Page, FetchError> {
        with_retry_if(&self.retry, || self.fetch_once(url), FetchError::is_retryable).await
    }
}

/// Quota for a possibly fractional requests-per-second rate
///
/// Whole rates allow a burst of that many requests; fractional rates space
/// every request by `1 / rate` seconds. Non-positive rates fall back to one
/// request per second.
fn rate_quota(rate: f64) -> Quota {
    let fallback = Quota::per_second(NonZeroU32::MIN);
    if !(rate > 0.0 && rate.is_finite()) {
        return fallback;
    }

    if rate >= 1.0 && rate.fract() == 0.0 {
        return NonZeroU32::new(rate.min(u32::MAX as f64) as u32)
            .map(Quota::per_second)
            .unwrap_or(fallback);
    }

    Quota::with_period(Duration::from_secs_f64(1.0 / rate)).unwrap_or(fallback)
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_rotation() {
        let fetcher = PageFetcher::new(10).unwrap();

        let mut agents = std::collections::HashSet::new();
        for _ in 0..100 {
            let agent = fetcher.random_user_agent();
            assert!(USER_AGENTS.contains(&agent));
            agents.insert(agent);
        }

        assert!(agents.len() > 1, "User agents should rotate");
    }

    #[test]
    fn test_fixed_user_agent_header() {
        let fetcher = PageFetcher::new(10).unwrap().with_user_agent("store-locator-test");
        let headers = fetcher.build_headers();

        assert_eq!(
            headers.get(USER_AGENT).unwrap().to_str().unwrap(),
            "store-locator-test"
        );
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
    }

    #[test]
    fn test_fetcher_creation() {
        assert!(PageFetcher::new(10).is_ok());
        assert!(PageFetcher::with_config(5, 3, Duration::from_secs(10)).is_ok());
        assert!(PageFetcher::from_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_fractional_rate_quota() {
        assert_eq!(rate_quota(0.5).replenish_interval(), Duration::from_secs(2));
        assert_eq!(
            rate_quota(2.5).replenish_interval(),
            Duration::from_millis(400)
        );
        assert_eq!(rate_quota(8.0).burst_size().get(), 8);
        assert_eq!(rate_quota(0.0).replenish_interval(), Duration::from_secs(1));
        assert_eq!(rate_quota(f64::NAN).replenish_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_half_rate_allows_single_request() {
        let limiter = RateLimiter::direct(rate_quota(0.5));
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_rate_falls_back_to_one() {
        assert!(PageFetcher::new(0).is_ok());
    }
}
