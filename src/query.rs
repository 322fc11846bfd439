//! Timestamp queries against the interval store.
//!
//! Turns the path components of a request (`year`, `month`, `day`, `hour`,
//! `minute`, each optional) into an instant, resolves it against the store
//! and builds the JSON response. Kept free of HTTP framework types so the
//! response contract can be tested directly; `server` only adapts it.
//!
//! Response contract:
//! - hit: 200 with the record.
//! - invalid date/time or no record for the interval: 500 with
//!   `{"error": "<message>"}`. Misses before, after and inside the ingested
//!   range all look the same.
//! - unmatched path: 400 with `{"error": "No API endpoint"}`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::PoisonError;

use crate::model::{QueryError, Record};
use crate::store::{IntervalStore, SharedStore};

pub const DEFAULT_YEAR: i32 = 2020;
pub const DEFAULT_MONTH: u32 = 1;
pub const DEFAULT_DAY: u32 = 1;
pub const DEFAULT_HOUR: u32 = 0;
pub const DEFAULT_MINUTE: u32 = 0;

pub const NO_ENDPOINT: &str = "No API endpoint";

/// Raw path components. Absent components take the `DEFAULT_*` values.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QueryParams {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub hour: Option<String>,
    pub minute: Option<String>,
}

impl QueryParams {
    /// Params from numeric components, mostly for tests and callers that
    /// already have parsed values.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        QueryParams {
            year: Some(year.to_string()),
            month: Some(month.to_string()),
            day: Some(day.to_string()),
            hour: Some(hour.to_string()),
            minute: Some(minute.to_string()),
        }
    }
}

/// Status code and JSON body for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub status: u16,
    pub body: Value,
}

impl QueryResponse {
    pub fn ok(body: Value) -> Self {
        QueryResponse { status: 200, body }
    }

    pub fn error(status: u16, message: &str) -> Self {
        QueryResponse {
            status,
            body: json!({ "error": message }),
        }
    }
}

fn component<T: std::str::FromStr>(
    name: &str,
    raw: Option<&str>,
    default: T,
) -> Result<T, QueryError> {
    match raw {
        None => Ok(default),
        Some(s) => s.trim().parse::<T>().map_err(|_| {
            QueryError::InvalidTimestamp(format!("{} '{}' is not a number", name, s))
        }),
    }
}

/// Resolve path components to a UTC instant.
pub fn resolve_timestamp(params: &QueryParams) -> Result<DateTime<Utc>, QueryError> {
    let year = component("year", params.year.as_deref(), DEFAULT_YEAR)?;
    let month = component("month", params.month.as_deref(), DEFAULT_MONTH)?;
    let day = component("day", params.day.as_deref(), DEFAULT_DAY)?;
    let hour = component("hour", params.hour.as_deref(), DEFAULT_HOUR)?;
    let minute = component("minute", params.minute.as_deref(), DEFAULT_MINUTE)?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        QueryError::InvalidTimestamp(format!(
            "{:04}-{:02}-{:02} is not a calendar date",
            year, month, day
        ))
    })?;
    let datetime = date.and_hms_opt(hour, minute, 0).ok_or_else(|| {
        QueryError::InvalidTimestamp(format!("{:02}:{:02} is not a time of day", hour, minute))
    })?;

    Ok(DateTime::from_naive_utc_and_offset(datetime, Utc))
}

/// Record for the interval containing the requested instant.
pub fn lookup(store: &IntervalStore, params: &QueryParams) -> Result<Record, QueryError> {
    let at = resolve_timestamp(params)?;
    store.lookup(at).cloned().ok_or(QueryError::NoRecord(at))
}

/// Full query against the shared store.
pub fn respond(store: &SharedStore, params: &QueryParams) -> QueryResponse {
    let result = {
        let store = store.read().unwrap_or_else(PoisonError::into_inner);
        lookup(&store, params)
    };

    match result {
        Ok(record) => match serde_json::to_value(&record) {
            Ok(body) => QueryResponse::ok(body),
            Err(e) => QueryResponse::error(500, &format!("Failed to encode record: {}", e)),
        },
        Err(err) => QueryResponse::error(500, &err.to_string()),
    }
}

/// Response for paths outside the query routes.
pub fn no_endpoint() -> QueryResponse {
    QueryResponse::error(400, NO_ENDPOINT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn shared_with_midnight_record() -> SharedStore {
        let mut store = IntervalStore::for_year(2020).unwrap();
        let mut record = Record::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(), Some(-0.531));
        record.metadata.insert("q".to_string(), json!("p"));
        store.append(vec![record]).unwrap();
        store.into_shared()
    }

    #[test]
    fn test_all_components_default() {
        let at = resolve_timestamp(&QueryParams::default()).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_partial_components_fill_defaults() {
        let params = QueryParams {
            year: Some("2020".to_string()),
            month: Some("6".to_string()),
            ..QueryParams::default()
        };
        let at = resolve_timestamp(&params).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_zero_padded_components_parse() {
        let params = QueryParams {
            hour: Some("09".to_string()),
            minute: Some("06".to_string()),
            ..QueryParams::default()
        };
        let at = resolve_timestamp(&params).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2020, 1, 1, 9, 6, 0).unwrap());
    }

    #[test]
    fn test_invalid_calendar_values_are_rejected() {
        for params in [
            QueryParams::at(2020, 13, 1, 0, 0),
            QueryParams::at(2021, 2, 29, 0, 0),
            QueryParams::at(2020, 1, 1, 24, 0),
            QueryParams::at(2020, 1, 1, 0, 60),
        ] {
            assert!(
                matches!(resolve_timestamp(&params), Err(QueryError::InvalidTimestamp(_))),
                "{:?} should be invalid",
                params
            );
        }
    }

    #[test]
    fn test_non_numeric_component_is_rejected() {
        let params = QueryParams {
            month: Some("june".to_string()),
            ..QueryParams::default()
        };
        match resolve_timestamp(&params) {
            Err(QueryError::InvalidTimestamp(msg)) => assert!(msg.contains("month")),
            other => panic!("expected invalid timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_respond_hit_returns_record() {
        let store = shared_with_midnight_record();
        let response = respond(&store, &QueryParams::at(2020, 1, 1, 0, 3));
        assert_eq!(response.status, 200);
        assert_eq!(response.body["value"], -0.531);
        assert_eq!(response.body["metadata"]["q"], "p");
    }

    #[test]
    fn test_respond_miss_and_invalid_share_error_shape() {
        let store = shared_with_midnight_record();

        let miss = respond(&store, &QueryParams::at(2020, 1, 1, 0, 6));
        let invalid = respond(&store, &QueryParams::at(2020, 13, 1, 0, 0));

        for response in [&miss, &invalid] {
            assert_eq!(response.status, 500);
            assert!(response.body["error"].is_string());
            assert_eq!(response.body.as_object().unwrap().len(), 1);
        }
        assert_eq!(miss.body["error"], "No record found for 2020-01-01 00:06");
    }

    #[test]
    fn test_no_endpoint_response() {
        let response = no_endpoint();
        assert_eq!(response.status, 400);
        assert_eq!(response.body, json!({ "error": "No API endpoint" }));
    }
}
