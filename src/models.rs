// Core data structures for the store locator

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// One harvested store listing, produced once per store page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StoreRecord {
    /// Identifier from the page's favorite link, if present
    pub store_id: Option<String>,
    pub subdivision: String,
    pub subdivision_abbr: String,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub address: Option<String>,
    /// Only present on page variants that embed a JSON-LD location block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Final URL of the store page after redirects
    pub url: String,
    /// Desktop schedule rows in page order
    pub hours: Vec<HourRow>,
}

/// One opening-hours row from a store page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HourRow {
    pub day: Option<String>,
    pub open: Option<String>,
    pub close: Option<String>,
}

impl HourRow {
    pub fn new(day: &str, open: &str, close: &str) -> Self {
        Self {
            day: Some(day.to_string()),
            open: Some(open.to_string()),
            close: Some(close.to_string()),
        }
    }
}

/// Geographic point attached by the enricher
///
/// Serialized as a `[latitude, longitude]` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.latitude, self.longitude).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Coordinates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (latitude, longitude) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Self::new(latitude, longitude))
    }
}

/// Depth of a page in the store directory
///
/// The directory is always three listing levels deep before the store pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlLevel {
    Root,
    Subdivision,
    City,
    Store,
}

impl CrawlLevel {
    /// Level reached by following a link on a page at this level
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Root => Some(Self::Subdivision),
            Self::Subdivision => Some(Self::City),
            Self::City => Some(Self::Store),
            Self::Store => None,
        }
    }

    pub fn is_leaf(self) -> bool {
        self == Self::Store
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Subdivision => "subdivision",
            Self::City => "city",
            Self::Store => "store",
        }
    }
}

impl std::fmt::Display for CrawlLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Crawl statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    /// Listing pages fetched and expanded
    pub listing_pages: u32,
    /// Links scheduled for the next level
    pub links_followed: u32,
    /// Store records written
    pub records_emitted: u32,
    /// Branches dropped because of fetch or extraction failure
    pub failed_branches: u32,
    /// Wall-clock crawl time in seconds
    pub duration_secs: f64,
}

impl CrawlStats {
    pub fn pages_visited(&self) -> u32 {
        self.listing_pages + self.records_emitted + self.failed_branches
    }

    /// Calculate error rate as percentage of visited pages
    pub fn error_rate(&self) -> f64 {
        let visited = self.pages_visited();
        if visited == 0 {
            0.0
        } else {
            (self.failed_branches as f64 / visited as f64) * 100.0
        }
    }

    pub fn set_duration(&mut self, elapsed: Duration) {
        self.duration_secs = elapsed.as_secs_f64();
    }
}

/// Enrichment statistics
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct EnrichStats {
    /// Records written to the output
    pub records: u32,
    /// Records with coordinates
    pub located: u32,
    /// Lookups the provider answered with no match
    pub not_found: u32,
    /// Lookups that failed (timeouts, provider errors)
    pub failed: u32,
    /// Records without an address, never looked up
    pub missing_address: u32,
    /// Malformed input lines skipped
    pub skipped_lines: u32,
}

impl EnrichStats {
    /// Share of records that received coordinates, as percentage
    pub fn hit_rate(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            (self.located as f64 / self.records as f64) * 100.0
        }
    }
}
