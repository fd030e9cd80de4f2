//! Unified error type for the store-locator library
//!
//! Operations that can fail for more than one domain reason return
//! [`Error`]; single-domain operations keep their own error from
//! [`crate::utils::error`].

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{CrawlerError, ExtractError, FetchError, GeocodeError, StorageError};

/// Unified error type for the store-locator crate
#[derive(Error, Debug)]
pub enum Error {
    /// Record file errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
