/// Core data types for the tide record service.
///
/// This module defines the shared domain model imported by all other modules:
/// the stored record, the product selector, and the error types raised while
/// fetching, storing and querying records. It contains no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Interval cadence
// ---------------------------------------------------------------------------

/// Length of one storage interval, in minutes. CO-OPS publishes both water
/// level observations and tide predictions on this cadence.
pub const INTERVAL_MINUTES: i64 = 6;

/// Provider timestamp format for record times (always GMT in our requests).
pub const PROVIDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Data product requested from CO-OPS.
///
/// The product decides both the `product=` query parameter and the shape of
/// the JSON payload that comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// Verified/preliminary observed water levels. Records live under `data`
    /// with a sibling `metadata` object describing the station.
    WaterLevel,
    /// Astronomical tide predictions. Records live under `predictions`.
    Predictions,
}

impl Product {
    /// The provider's name for this product.
    pub fn api_name(&self) -> &'static str {
        match self {
            Product::WaterLevel => "water_level",
            Product::Predictions => "predictions",
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}

// ---------------------------------------------------------------------------
// Record type
// ---------------------------------------------------------------------------

/// A single six-minute sample for the monitored station.
///
/// Corresponds to one entry of the `data[]` or `predictions[]` array of a
/// CO-OPS datagetter response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Start of the interval this sample belongs to. Always on a 6-minute
    /// boundary.
    pub timestamp: DateTime<Utc>,
    /// Reading in the requested units. `None` when the provider reported the
    /// sample with an empty value (sensor outage).
    pub value: Option<f64>,
    /// Remaining provider fields (`s`, `f`, `q`, ...), kept verbatim.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Record without provider metadata.
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Record {
            timestamp,
            value,
            metadata: serde_json::Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding CO-OPS data.
#[derive(Debug, PartialEq)]
pub enum CoopsError {
    /// Non-2xx HTTP response from the CO-OPS API.
    HttpError(u16),
    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    Transport(String),
    /// The provider answered with an `error` payload instead of data.
    Provider(String),
    /// The response body, a timestamp or a value could not be decoded.
    ParseError(String),
}

impl std::fmt::Display for CoopsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoopsError::HttpError(code) => write!(f, "HTTP error: {}", code),
            CoopsError::Transport(msg) => write!(f, "Transport error: {}", msg),
            CoopsError::Provider(msg) => write!(f, "Provider error: {}", msg),
            CoopsError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for CoopsError {}

impl From<reqwest::Error> for CoopsError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CoopsError::HttpError(status.as_u16()),
            None if err.is_decode() => CoopsError::ParseError(err.to_string()),
            None => CoopsError::Transport(err.to_string()),
        }
    }
}

/// Errors raised by `IntervalStore::append`. A rejected batch leaves the
/// store untouched.
#[derive(Debug, PartialEq)]
pub enum StoreError {
    /// A record would land at `index` but the store already holds `len`
    /// slots (or the batch itself goes backwards).
    OutOfOrderAppend { index: i64, len: usize },
    /// A record timestamp is not on a 6-minute boundary.
    Misaligned { timestamp: DateTime<Utc> },
    /// A record maps past the last slot a bounded store may hold.
    BeyondCapacity { timestamp: DateTime<Utc>, capacity: usize },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::OutOfOrderAppend { index, len } => write!(
                f,
                "Out of order append: record maps to slot {} but store already has {} slots",
                index, len
            ),
            StoreError::Misaligned { timestamp } => write!(
                f,
                "Misaligned record: {} is not on a {}-minute boundary",
                timestamp.format(PROVIDER_TIME_FORMAT),
                INTERVAL_MINUTES
            ),
            StoreError::BeyondCapacity { timestamp, capacity } => write!(
                f,
                "Record at {} lies beyond the store's {} slots",
                timestamp.format(PROVIDER_TIME_FORMAT),
                capacity
            ),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors surfaced to query-layer callers. Both variants are reported with
/// the same response shape.
#[derive(Debug, PartialEq)]
pub enum QueryError {
    /// A path component was not a number or the date/time does not exist.
    InvalidTimestamp(String),
    /// The timestamp is valid but no record is stored for its interval.
    NoRecord(DateTime<Utc>),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidTimestamp(msg) => write!(f, "Invalid date/time: {}", msg),
            QueryError::NoRecord(at) => write!(
                f,
                "No record found for {}",
                at.format(PROVIDER_TIME_FORMAT)
            ),
        }
    }
}

impl std::error::Error for QueryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_product_api_names() {
        assert_eq!(Product::WaterLevel.api_name(), "water_level");
        assert_eq!(Product::Predictions.api_name(), "predictions");
        assert_eq!(Product::Predictions.to_string(), "predictions");
    }

    #[test]
    fn test_product_deserializes_from_provider_name() {
        let p: Product = serde_json::from_str("\"water_level\"").unwrap();
        assert_eq!(p, Product::WaterLevel);
    }

    #[test]
    fn test_record_serializes_metadata_verbatim() {
        let mut record = Record::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(), Some(-0.531));
        record.metadata.insert("q".to_string(), serde_json::json!("v"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "2020-01-01T00:00:00Z");
        assert_eq!(json["value"], -0.531);
        assert_eq!(json["metadata"]["q"], "v");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(CoopsError::HttpError(503).to_string(), "HTTP error: 503");
        let at = Utc.with_ymd_and_hms(2020, 3, 1, 12, 6, 0).unwrap();
        assert_eq!(
            QueryError::NoRecord(at).to_string(),
            "No record found for 2020-03-01 12:06"
        );
    }
}
