//! Coordinate enrichment for crawled store records
//!
//! Records are read line by line, the `address` field is looked up through a
//! [`Geocoder`] and a `coordinates` field is attached before the record is
//! written back out. Provider calls are serialized through a [`Throttle`] so
//! that consecutive lookups start at least [`THROTTLE_INTERVAL`] apart.

pub mod nominatim;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::io::{BufRead, Write};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::geocode::nominatim::NominatimGeocoder;
use crate::models::{Coordinates, EnrichStats};
use crate::storage::{JsonLinesReader, JsonLinesWriter, RecordFields};
use crate::utils::error::{GeocodeError, StorageError};
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Minimum spacing between the starts of two provider calls
pub const THROTTLE_INTERVAL: Duration = Duration::from_secs(1);

/// Country restriction applied to every lookup
pub const COUNTRY_FILTER: &str = "us";

/// Field holding the free-form address to look up
pub const ADDRESS_FIELD: &str = "address";

/// Field the enricher writes
pub const COORDINATES_FIELD: &str = "coordinates";

/// Free-form address lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `query` within `country` (ISO 3166-1 alpha-2, lowercase)
    ///
    /// `Ok(None)` means the provider answered but found no match.
    async fn geocode(
        &self,
        query: &str,
        country: &str,
    ) -> std::result::Result<Option<Coordinates>, GeocodeError>;
}

/// Enforces a minimum interval between call starts
///
/// The lock is held for the whole call, so calls never overlap even when
/// several tasks share one throttle.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::new(None),
        }
    }

    /// Run `f` once the interval since the previous start has elapsed
    pub async fn call<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last_start = Some(Instant::now());
        f().await
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(THROTTLE_INTERVAL)
    }
}

/// Result of enriching one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup {
    /// Provider returned a location
    Found(Coordinates),
    /// Provider answered with no match
    NotFound,
    /// Provider failed after all retries
    Failed,
    /// Record has no address to look up
    NoAddress,
}

impl Lookup {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Found(coordinates) => Some(*coordinates),
            _ => None,
        }
    }

    fn record(&self, stats: &mut EnrichStats) {
        match self {
            Self::Found(_) => stats.located += 1,
            Self::NotFound => stats.not_found += 1,
            Self::Failed => stats.failed += 1,
            Self::NoAddress => stats.missing_address += 1,
        }
    }
}

/// Attaches coordinates to records through a throttled geocoder
pub struct Enricher<G> {
    geocoder: G,
    throttle: Throttle,
    retry: RetryConfig,
}

impl Enricher<NominatimGeocoder> {
    /// Create an enricher backed by the configured Nominatim service
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let geocoder = NominatimGeocoder::from_config(config)
            .context("Failed to create geocoding client")?;

        Ok(Self::new(geocoder).with_retry(RetryConfig::fixed(
            config.geocoder.max_retries,
            Duration::from_secs(config.geocoder.error_wait_secs),
        )))
    }
}

impl<G: Geocoder> Enricher<G> {
    /// Create an enricher with the default one-second throttle and no retries
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            throttle: Throttle::default(),
            retry: RetryConfig::fixed(0, Duration::ZERO),
        }
    }

    /// Retry transient provider errors with this policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the throttle
    #[must_use]
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Look up one address
    ///
    /// Every attempt, retries included, goes through the throttle. Errors
    /// never escape: they are logged and reported as [`Lookup::Failed`].
    pub async fn lookup(&self, address: &str) -> Lookup {
        let result = with_retry_if(
            &self.retry,
            move || {
                self.throttle
                    .call(move || self.geocoder.geocode(address, COUNTRY_FILTER))
            },
            GeocodeError::is_transient,
        )
        .await;

        match result {
            Ok(Some(coordinates)) => Lookup::Found(coordinates),
            Ok(None) => Lookup::NotFound,
            Err(e) => {
                tracing::warn!(address, error = %e, "Geocoding failed");
                Lookup::Failed
            }
        }
    }

    /// Attach a `coordinates` field to one record
    ///
    /// All other fields are kept in their input order. An existing
    /// `coordinates` field is overwritten in place.
    pub async fn enrich(&self, mut record: RecordFields) -> (RecordFields, Lookup) {
        let lookup = match record_address(&record) {
            Some(address) => self.lookup(&address).await,
            None => Lookup::NoAddress,
        };

        let value = lookup
            .coordinates()
            .and_then(|c| serde_json::to_value(c).ok())
            .unwrap_or(Value::Null);
        record.insert(COORDINATES_FIELD.to_string(), value);

        (record, lookup)
    }

    /// Enrich every record from `reader` into `writer`
    ///
    /// Output records are written and flushed one at a time, in input
    /// order. Malformed input lines abort the run unless `skip_malformed`
    /// is set, in which case they are logged and left out of the output.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or, without `skip_malformed`, on the
    /// first malformed input line.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        reader: JsonLinesReader<R>,
        writer: &mut JsonLinesWriter<W>,
        skip_malformed: bool,
    ) -> Result<EnrichStats> {
        let mut stats = EnrichStats::default();

        for item in reader {
            let input = match item {
                Ok(input) => input,
                Err(StorageError::MalformedLine { line, source }) if skip_malformed => {
                    tracing::warn!(line, error = %source, "Skipping malformed record");
                    stats.skipped_lines += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let (record, lookup) = self.enrich(input.fields).await;
            writer.write_record(&record)?;

            lookup.record(&mut stats);
            stats.records += 1;

            let address = record.get(ADDRESS_FIELD).and_then(Value::as_str);
            tracing::info!(
                line = input.line,
                address = ?address,
                coordinates = ?lookup.coordinates().map(|c| (c.latitude, c.longitude)),
                "Enriched record"
            );
        }

        tracing::info!(
            records = stats.records,
            located = stats.located,
            not_found = stats.not_found,
            failed = stats.failed,
            missing_address = stats.missing_address,
            skipped = stats.skipped_lines,
            "Geocoding finished"
        );

        Ok(stats)
    }
}

/// Address of a record, if present as a non-blank string
fn record_address(record: &RecordFields) -> Option<String> {
    record
        .get(ADDRESS_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex as StdMutex;

    /// Scripted geocoder recording call start times
    #[derive(Default)]
    struct FakeGeocoder {
        answers: HashMap<String, Coordinates>,
        timeouts: Vec<String>,
        calls: StdMutex<Vec<(String, Instant)>>,
    }

    impl FakeGeocoder {
        fn with_answer(mut self, query: &str, lat: f64, lon: f64) -> Self {
            self.answers
                .insert(query.to_string(), Coordinates::new(lat, lon));
            self
        }

        fn with_timeout(mut self, query: &str) -> Self {
            self.timeouts.push(query.to_string());
            self
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(
            &self,
            query: &str,
            country: &str,
        ) -> std::result::Result<Option<Coordinates>, GeocodeError> {
            assert_eq!(country, COUNTRY_FILTER);
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), Instant::now()));

            if self.timeouts.iter().any(|q| q == query) {
                return Err(GeocodeError::Timeout);
            }
            Ok(self.answers.get(query).copied())
        }
    }

    fn record(value: Value) -> RecordFields {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_call_starts() {
        let throttle = Throttle::new(Duration::from_secs(1));
        let mut starts = Vec::new();

        for _ in 0..3 {
            starts.push(throttle.call(|| async { Instant::now() }).await);
        }

        assert!(starts[1] - starts[0] >= Duration::from_secs(1));
        assert!(starts[2] - starts[1] >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_first_call_is_immediate() {
        let throttle = Throttle::default();
        let before = Instant::now();
        throttle.call(|| async {}).await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrich_found() {
        let enricher = Enricher::new(FakeGeocoder::default().with_answer(
            "123 Main St, Springfield, US",
            39.0,
            -89.0,
        ));

        let (out, lookup) = enricher
            .enrich(record(json!({"address": "123 Main St, Springfield, US"})))
            .await;

        assert_eq!(lookup, Lookup::Found(Coordinates::new(39.0, -89.0)));
        assert_eq!(
            Value::Object(out),
            json!({"address": "123 Main St, Springfield, US", "coordinates": [39.0, -89.0]})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrich_timeout_yields_null() {
        let enricher = Enricher::new(FakeGeocoder::default().with_timeout("Unknown Rd"));

        let (out, lookup) = enricher.enrich(record(json!({"address": "Unknown Rd"}))).await;

        assert_eq!(lookup, Lookup::Failed);
        assert_eq!(out["coordinates"], Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_through_throttle() {
        let geocoder = FakeGeocoder::default().with_timeout("Unknown Rd");
        let enricher =
            Enricher::new(geocoder).with_retry(RetryConfig::fixed(2, Duration::from_secs(5)));

        let lookup = enricher.lookup("Unknown Rd").await;

        assert_eq!(lookup, Lookup::Failed);
        assert_eq!(enricher.geocoder.call_count(), 3);
        let times = enricher.geocoder.call_times();
        assert!(times[1] - times[0] >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_or_null_address_skips_lookup() {
        let enricher = Enricher::new(FakeGeocoder::default());

        let (out, lookup) = enricher.enrich(record(json!({"city": "Austin"}))).await;
        assert_eq!(lookup, Lookup::NoAddress);
        assert_eq!(out["coordinates"], Value::Null);

        let (_, lookup) = enricher.enrich(record(json!({"address": null}))).await;
        assert_eq!(lookup, Lookup::NoAddress);

        assert_eq!(enricher.geocoder.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_coordinates_overwritten_in_place() {
        let enricher = Enricher::new(FakeGeocoder::default().with_answer("1 A St", 1.0, 2.0));

        let (out, _) = enricher
            .enrich(record(json!({
                "coordinates": [0.0, 0.0],
                "address": "1 A St",
                "zip": null
            })))
            .await;

        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, ["coordinates", "address", "zip"]);
        assert_eq!(out["coordinates"], json!([1.0, 2.0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_preserves_order_and_fields() {
        let geocoder = FakeGeocoder::default()
            .with_answer("1 A St", 1.0, 2.0)
            .with_answer("3 C St", 5.0, 6.0);
        let enricher = Enricher::new(geocoder);

        let input = concat!(
            "{\"store_id\":\"1\",\"address\":\"1 A St\",\"hours\":[]}\n",
            "{\"store_id\":\"2\",\"address\":\"2 B St\"}\n",
            "\n",
            "{\"store_id\":\"3\",\"address\":\"3 C St\",\"url\":\"http://x\"}\n",
        );
        let mut writer = JsonLinesWriter::new(Vec::new());

        let stats = enricher
            .run(JsonLinesReader::new(Cursor::new(input)), &mut writer, false)
            .await
            .unwrap();

        assert_eq!(stats.records, 3);
        assert_eq!(stats.located, 2);
        assert_eq!(stats.not_found, 1);

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"store_id":"1","address":"1 A St","hours":[],"coordinates":[1.0,2.0]}"#,
                r#"{"store_id":"2","address":"2 B St","coordinates":null}"#,
                r#"{"store_id":"3","address":"3 C St","url":"http://x","coordinates":[5.0,6.0]}"#,
            ]
        );

        let times = enricher.geocoder.call_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= THROTTLE_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_is_idempotent() {
        let enricher = Enricher::new(FakeGeocoder::default().with_answer("1 A St", 1.0, 2.0));
        let input = "{\"address\":\"1 A St\"}\n{\"address\":null}\n";

        let mut first = JsonLinesWriter::new(Vec::new());
        enricher
            .run(JsonLinesReader::new(Cursor::new(input)), &mut first, false)
            .await
            .unwrap();
        let first = first.into_inner().unwrap();

        let mut second = JsonLinesWriter::new(Vec::new());
        enricher
            .run(JsonLinesReader::new(Cursor::new(first.clone())), &mut second, false)
            .await
            .unwrap();

        assert_eq!(second.into_inner().unwrap(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_skips_invalid_utf8_line() {
        let enricher = Enricher::new(FakeGeocoder::default());
        let input: &[u8] = b"{\"address\":null}\n{\"address\":\"\xff\xfe\"}\n{\"address\":null}\n";

        let mut writer = JsonLinesWriter::new(Vec::new());
        let stats = enricher
            .run(JsonLinesReader::new(input), &mut writer, true)
            .await
            .unwrap();

        assert_eq!(stats.records, 2);
        assert_eq!(stats.skipped_lines, 1);
        assert_eq!(writer.written(), 2);

        let mut writer = JsonLinesWriter::new(Vec::new());
        let err = enricher
            .run(JsonLinesReader::new(input), &mut writer, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Storage(StorageError::MalformedLine { line: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_malformed_line() {
        let enricher = Enricher::new(FakeGeocoder::default());
        let input = "{\"address\":null}\nnot json\n{\"address\":null}\n";

        let mut writer = JsonLinesWriter::new(Vec::new());
        let err = enricher
            .run(JsonLinesReader::new(Cursor::new(input)), &mut writer, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Storage(StorageError::MalformedLine { line: 2, .. })
        ));

        let mut writer = JsonLinesWriter::new(Vec::new());
        let stats = enricher
            .run(JsonLinesReader::new(Cursor::new(input)), &mut writer, true)
            .await
            .unwrap();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.skipped_lines, 1);
        assert_eq!(writer.written(), 2);
    }
}
