//! store-locator - Store directory crawler and address geocoder
//!
//! A two-stage pipeline for restaurant-chain store directories: a crawler
//! that walks the directory hierarchy and writes one JSON record per store,
//! and an enricher that attaches coordinates to those records through a
//! rate-limited geocoding service.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Hierarchical directory crawling with rate limiting
//! - [`parser`] - Store page extraction (metadata, hours, JSON-LD)
//! - [`models`] - Core data structures and types
//! - [`geocode`] - Geocoder trait, call throttle and record enricher
//! - [`storage`] - Line-delimited JSON record files
//! - [`utils`] - Common utilities, error types and retry helpers
//!
//! # Example
//!
//! ```no_run
//! use store_locator::config::Config;
//! use store_locator::crawler::StoreCrawler;
//! use store_locator::storage::JsonLinesWriter;
//! use std::path::Path;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let crawler = StoreCrawler::from_config(&config)?;
//!     let mut writer = JsonLinesWriter::create(Path::new("stores.jsonl"))?;
//!
//!     let start = Url::parse(&config.crawler.start_url)?;
//!     crawler.run(start, |record| writer.write_record(&record)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod geocode;
pub mod models;
pub mod parser;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::StoreCrawler;
    pub use crate::error::{Error, Result};
    pub use crate::geocode::{Enricher, Geocoder, Throttle};
    pub use crate::models::{Coordinates, CrawlStats, EnrichStats, HourRow, StoreRecord};
    pub use crate::parser::StoreParser;
    pub use crate::storage::{JsonLinesReader, JsonLinesWriter};
}

// Direct re-exports for convenience
pub use models::{Coordinates, CrawlStats, EnrichStats, HourRow, StoreRecord};
