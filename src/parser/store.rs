//! Store page parser
//!
//! Turns one store page into a [`StoreRecord`]. Optional page elements map to
//! absent fields; only the state metadata is required.

use scraper::{ElementRef, Html, Selector};

use crate::models::{HourRow, StoreRecord};
use crate::parser::jsonld::extract_location;
use crate::parser::selectors::{HoursSelectors, StoreSelectors};
use crate::utils::error::ExtractError;
use crate::utils::non_empty_text;

/// Separator between abbreviation and full name in the state metadata
const SUBDIVISION_SEPARATOR: &str = ", ";

/// Store page parser
pub struct StoreParser {
    selectors: StoreSelectors,
}

impl StoreParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            selectors: StoreSelectors::new(),
        }
    }

    /// Parse a store page
    ///
    /// # Arguments
    /// * `html` - Raw HTML content
    /// * `url` - Final URL the page was served from
    ///
    /// # Errors
    /// Returns `ExtractError::MissingField` if the state metadata is missing,
    /// `ExtractError::MalformedSubdivision` if it is not "Abbr, Name", and the
    /// JSON-LD errors from [`extract_location`] for inconsistent location blocks.
    pub fn parse(&self, html: &str, url: &str) -> Result<StoreRecord, ExtractError> {
        let document = Html::parse_document(html);
        self.parse_document(&document, url)
    }

    /// Parse an already parsed store page
    pub fn parse_document(&self, document: &Html, url: &str) -> Result<StoreRecord, ExtractError> {
        let hours = self.extract_hours(document);

        let state = meta_content(document, self.selectors.meta.state)
            .ok_or(ExtractError::MissingField("state"))?;
        let (subdivision_abbr, subdivision) = split_subdivision(&state)?;

        let blocks: Vec<String> = document
            .select(self.selectors.json_ld)
            .map(|el| el.text().collect::<String>())
            .collect();
        let location = extract_location(blocks.iter().map(String::as_str))?;

        Ok(StoreRecord {
            store_id: self.extract_store_id(document),
            subdivision,
            subdivision_abbr,
            city: meta_content(document, self.selectors.meta.city),
            zip: meta_content(document, self.selectors.meta.zip),
            address: meta_content(document, self.selectors.meta.address),
            longitude: location.map(|p| p.longitude),
            latitude: location.map(|p| p.latitude),
            url: url.to_string(),
            hours,
        })
    }

    /// Read desktop hours rows in page order
    fn extract_hours(&self, document: &Html) -> Vec<HourRow> {
        let hours: &HoursSelectors = &self.selectors.hours;

        document
            .select(hours.row)
            .map(|row| HourRow {
                day: row
                    .select(hours.day)
                    .next()
                    .and_then(|el| el.value().attr("data-daypart"))
                    .map(str::to_string),
                open: first_own_text(row, hours.open),
                close: first_own_text(row, hours.close),
            })
            .collect()
    }

    fn extract_store_id(&self, document: &Html) -> Option<String> {
        document
            .select(self.selectors.favorite)
            .find_map(|el| el.value().attr("data-fid"))
            .map(str::to_string)
    }
}

impl Default for StoreParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split "TX, Texas" into ("TX", "Texas")
///
/// The value must contain exactly one separator.
pub fn split_subdivision(raw: &str) -> Result<(String, String), ExtractError> {
    let mut parts = raw.split(SUBDIVISION_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(abbr), Some(name), None) => Ok((abbr.to_string(), name.to_string())),
        _ => Err(ExtractError::MalformedSubdivision(raw.to_string())),
    }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::to_string)
}

// Text directly inside the first matching element, ignoring nested markup
fn first_own_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let element = scope.select(selector).next()?;
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .find_map(|text| non_empty_text(text))
}
