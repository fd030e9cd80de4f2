//! HTML parsing and data extraction
//!
//! This module handles parsing store directory pages: link discovery on
//! listing pages lives in [`crate::crawler::links`], store page extraction here.

pub mod jsonld;
pub mod selectors;
pub mod store;

// Re-export main parser and public types
pub use jsonld::{extract_location, GeoPoint, LOCATION_TYPE};
pub use store::{split_subdivision, StoreParser};
