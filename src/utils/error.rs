//! Error types for the store locator
//!
//! This module defines custom error types used throughout the application.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,
}

impl FetchError {
    /// Whether another attempt at the same request may succeed
    ///
    /// Retry on timeouts, transport failures, 429 and 5xx gateway errors.
    /// Client errors such as 404 are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Http(_) => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
        }
    }
}

/// Structural problems on a store page
///
/// Any of these drops the page's branch; sibling branches are unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// Required page element or metadata field not present
    #[error("Required field not found: {0}")]
    MissingField(&'static str),

    /// State metadata not in "Abbr, Full Name" form
    #[error("Malformed subdivision field: {0:?}")]
    MalformedSubdivision(String),

    /// Embedded JSON-LD block is not valid JSON
    #[error("Invalid JSON-LD block: {0}")]
    InvalidJsonLd(String),

    /// JSON-LD present but no object carries the location type
    #[error("No {0} object in JSON-LD")]
    LocationNotFound(&'static str),

    /// More than one JSON-LD object carries the location type
    #[error("Ambiguous JSON-LD location: {0} matching objects")]
    AmbiguousLocation(usize),

    /// Location object lacks a usable geo sub-object
    #[error("Location object has no usable geo coordinates")]
    MissingGeo,
}

/// Errors reported by a geocoding provider
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// Provider did not answer in time
    #[error("Geocoder timed out")]
    Timeout,

    /// HTTP transport error
    #[error("Geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the provider
    #[error("Geocoder returned status {0}")]
    ServerError(u16),

    /// Provider response could not be interpreted
    #[error("Geocoder response could not be decoded: {0}")]
    Decode(String),
}

impl GeocodeError {
    /// Whether the lookup is worth repeating after a pause
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Http(_) => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Decode(_) => false,
        }
    }
}

/// Errors reading or writing line-delimited record files
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("Failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Input line is not a JSON object
    #[error("Malformed record on line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a single crawl branch
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Store page extraction error
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),
}
