/// NOAA CO-OPS Data API Client
///
/// Retrieves six-minute water level observations and tide predictions from
/// the Center for Operational Oceanographic Products and Services
/// datagetter endpoint.
///
/// API Documentation: https://api.tidesandcurrents.noaa.gov/api/prod/
///
/// The payload layout depends on the product: water level responses nest
/// records under `data` next to a `metadata` object, prediction responses put
/// them directly under `predictions`. Either product may instead answer with
/// an `error` object and HTTP 200.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::ingest::window::Window;
use crate::ingest::Provider;
use crate::model::{CoopsError, Product, Record, PROVIDER_TIME_FORMAT};

pub const COOPS_BASE_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

// ============================================================================
// CO-OPS API Response Structures
// ============================================================================

/// One entry of a `data[]` or `predictions[]` array.
#[derive(Debug, Deserialize)]
pub struct RawRecord {
    /// Interval start, `YYYY-MM-DD HH:MM` in the requested time zone.
    pub t: String,
    /// Decimal value as a string; empty when the sample is missing.
    #[serde(default)]
    pub v: String,
    /// Sigma, flags, quality and anything else the product adds.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Station description returned alongside water level data.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StationMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
}

#[derive(Debug, Deserialize)]
pub struct WaterLevelResponse {
    pub metadata: StationMetadata,
    pub data: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<RawRecord>,
}

/// Success payload, decoded according to the configured product.
#[derive(Debug)]
pub enum ProductPayload {
    WaterLevel(WaterLevelResponse),
    Predictions(PredictionsResponse),
}

impl ProductPayload {
    fn decode(product: Product, json: serde_json::Value) -> Result<Self, serde_json::Error> {
        match product {
            Product::WaterLevel => serde_json::from_value(json).map(ProductPayload::WaterLevel),
            Product::Predictions => serde_json::from_value(json).map(ProductPayload::Predictions),
        }
    }

    fn into_parts(self) -> (Option<StationMetadata>, Vec<RawRecord>) {
        match self {
            ProductPayload::WaterLevel(r) => (Some(r.metadata), r.data),
            ProductPayload::Predictions(r) => (None, r.predictions),
        }
    }
}

/// Parsed result of one window request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowData {
    /// Present for water level responses only.
    pub station: Option<StationMetadata>,
    /// Records in payload order.
    pub records: Vec<Record>,
}

// ============================================================================
// Request construction
// ============================================================================

/// Fixed query parameters shared by every window request.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub base_url: String,
    pub station: String,
    pub product: Product,
    pub datum: String,
    pub units: String,
    /// Caller identification the provider asks clients to send.
    pub application: String,
}

/// Build the datagetter URL for one window. Parameter values are
/// form-encoded, so configured strings cannot add or split parameters.
pub fn build_datagetter_url(request: &DataRequest, window: &Window) -> Result<reqwest::Url, CoopsError> {
    let begin = window.begin_param();
    let end = window.end_param();
    reqwest::Url::parse_with_params(
        &request.base_url,
        &[
            ("begin_date", begin.as_str()),
            ("end_date", end.as_str()),
            ("station", request.station.as_str()),
            ("product", request.product.api_name()),
            ("datum", request.datum.as_str()),
            ("time_zone", "gmt"),
            ("units", request.units.as_str()),
            ("format", "json"),
            ("application", request.application.as_str()),
        ],
    )
    .map_err(|e| CoopsError::Transport(format!("invalid base URL '{}': {}", request.base_url, e)))
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a datagetter response body for `product`.
///
/// Records are returned in payload order. A single undecodable record fails
/// the whole window.
pub fn parse_response(product: Product, body: &str) -> Result<WindowData, CoopsError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| CoopsError::ParseError(format!("invalid JSON: {}", e)))?;

    // Error payloads arrive with HTTP 200: {"error": {"message": "..."}}
    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("unspecified provider error");
        return Err(CoopsError::Provider(message.to_string()));
    }

    let payload = ProductPayload::decode(product, json).map_err(|e| {
        CoopsError::ParseError(format!("unexpected {} payload: {}", product, e))
    })?;
    let (station, raw) = payload.into_parts();

    let records = raw
        .into_iter()
        .map(parse_record)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WindowData { station, records })
}

fn parse_record(raw: RawRecord) -> Result<Record, CoopsError> {
    let timestamp = parse_timestamp(&raw.t)?;

    let value = match raw.v.trim() {
        "" => None,
        v => Some(v.parse::<f64>().map_err(|_| {
            CoopsError::ParseError(format!("invalid value '{}' at {}", raw.v, raw.t))
        })?),
    };

    Ok(Record {
        timestamp,
        value,
        metadata: raw.extra,
    })
}

/// Parse a provider timestamp (format: "2020-01-01 00:00", GMT).
pub fn parse_timestamp(t: &str) -> Result<DateTime<Utc>, CoopsError> {
    NaiveDateTime::parse_from_str(t.trim(), PROVIDER_TIME_FORMAT)
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
        .map_err(|_| CoopsError::ParseError(format!("invalid timestamp '{}'", t)))
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking CO-OPS client bound to one station/product configuration.
pub struct CoopsClient {
    http: reqwest::blocking::Client,
    request: DataRequest,
}

impl CoopsClient {
    /// Create a client. `timeout` bounds each window request.
    pub fn new(request: DataRequest, timeout: Duration) -> Result<Self, CoopsError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(CoopsClient { http, request })
    }
}

impl Provider for CoopsClient {
    fn fetch_window(&self, window: &Window) -> Result<WindowData, CoopsError> {
        let url = build_datagetter_url(&self.request, window)?;

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(CoopsError::HttpError(response.status().as_u16()));
        }

        let body = response.text()?;
        parse_response(self.request.product, &body)
    }
}

// ============================================================================
// Tests
// ============================================================================
