//! JSON-LD location extraction
//!
//! Newer store pages embed one or more `application/ld+json` blocks holding
//! typed schema.org objects. Exactly one of them describes the restaurant
//! itself; its `geo` sub-object carries the coordinates.

use serde_json::Value;

use crate::utils::error::ExtractError;

/// schema.org type tag of the physical location object
pub const LOCATION_TYPE: &str = "Restaurant";

/// Latitude/longitude read from the location object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Find the single location object across all JSON-LD blocks and read its geo point
///
/// Returns `Ok(None)` when the page has no JSON-LD block at all (older page
/// layout). Blocks that fail to parse are skipped; `InvalidJsonLd` is only
/// returned when none of the present blocks parses. Parsed blocks holding
/// zero or several location objects are structural errors.
pub fn extract_location<'a, I>(blocks: I) -> Result<Option<GeoPoint>, ExtractError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parsed_block = false;
    let mut last_error = None;
    let mut matches = Vec::new();

    for raw in blocks {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparsable JSON-LD block");
                last_error = Some(e.to_string());
                continue;
            }
        };
        parsed_block = true;

        match value {
            Value::Array(items) => matches.extend(items.into_iter().filter(is_location)),
            item if is_location(&item) => matches.push(item),
            _ => {}
        }
    }

    if !parsed_block {
        return match last_error {
            Some(e) => Err(ExtractError::InvalidJsonLd(e)),
            None => Ok(None),
        };
    }

    match matches.len() {
        0 => Err(ExtractError::LocationNotFound(LOCATION_TYPE)),
        1 => read_geo(&matches[0]).map(Some),
        n => Err(ExtractError::AmbiguousLocation(n)),
    }
}

fn is_location(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(tag)) => tag == LOCATION_TYPE,
        Some(Value::Array(tags)) => tags.iter().any(|t| t.as_str() == Some(LOCATION_TYPE)),
        _ => false,
    }
}

fn read_geo(location: &Value) -> Result<GeoPoint, ExtractError> {
    let geo = location.get("geo").ok_or(ExtractError::MissingGeo)?;

    let latitude = geo.get("latitude").and_then(as_number);
    let longitude = geo.get("longitude").and_then(as_number);

    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(GeoPoint {
            latitude,
            longitude,
        }),
        _ => Err(ExtractError::MissingGeo),
    }
}

// Coordinates show up both as JSON numbers and as numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
