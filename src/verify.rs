//! Station Verification Module
//!
//! Probes the configured station/product against the live provider with a
//! single-day request to confirm data is actually published before a full
//! ingestion run is started.
//!
//! Run with: tidemon_service --verify

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::window::Window;
use crate::ingest::Provider;
use crate::model::Product;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationVerification {
    pub timestamp: String,
    pub station_id: String,
    pub product: Product,
    pub probe_day: String,
    pub status: VerificationStatus,
    /// Station name reported in water level metadata, if any.
    pub reported_name: Option<String>,
    pub sample_data_count: usize,
    pub missing_value_count: usize,
    pub error_message: Option<String>,
}

// ============================================================================
// Probe
// ============================================================================

/// Request `day` for the station and classify what came back.
///
/// * `Success`: records returned, all with values, metadata (when sent)
///   names the expected station.
/// * `PartialSuccess`: records returned but some values are missing or the
///   metadata names another station.
/// * `Failed`: the request failed or returned no records.
pub fn verify_station<P: Provider>(
    provider: &P,
    station_id: &str,
    product: Product,
    day: NaiveDate,
) -> StationVerification {
    let mut result = StationVerification {
        timestamp: Utc::now().to_rfc3339(),
        station_id: station_id.to_string(),
        product,
        probe_day: day.format("%Y-%m-%d").to_string(),
        status: VerificationStatus::Failed,
        reported_name: None,
        sample_data_count: 0,
        missing_value_count: 0,
        error_message: None,
    };

    let window = Window { begin: day, end: day };
    match provider.fetch_window(&window) {
        Ok(data) => {
            result.sample_data_count = data.records.len();
            result.missing_value_count = data.records.iter().filter(|r| r.value.is_none()).count();

            let mut station_matches = true;
            if let Some(meta) = data.station {
                station_matches = meta.id.is_empty() || meta.id == station_id;
                if !station_matches {
                    result.error_message = Some(format!(
                        "Provider metadata names station {}",
                        meta.id
                    ));
                }
                result.reported_name = Some(meta.name);
            }

            if result.sample_data_count == 0 {
                result.error_message = Some("No records returned".to_string());
            } else if result.missing_value_count == 0 && station_matches {
                result.status = VerificationStatus::Success;
            } else {
                result.status = VerificationStatus::PartialSuccess;
            }
        }
        Err(e) => {
            result.error_message = Some(e.to_string());
        }
    }

    result
}
