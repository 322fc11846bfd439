/// Windowed, ordered ingestion of a year of six-minute records.
///
/// The `Ingestor` is the only writer to the store. It walks its window queue
/// front to back, and each window's fetch and append fully resolve before
/// the next request is issued, so records always reach `IntervalStore::append`
/// in chronological order.
///
/// A failed window (network error, HTTP status, provider error payload,
/// undecodable body, a record outside the requested days, rejected append)
/// is logged and skipped; its intervals stay empty and later windows are
/// unaffected. There is no retry.
///
/// Submodules:
/// - `window`: splits the ingestion range into provider-sized requests.
/// - `coops` : CO-OPS datagetter client and payload parser.

pub mod coops;
pub mod window;

use std::collections::VecDeque;
use std::fmt;
use std::sync::PoisonError;

use chrono::{DateTime, Utc};

use crate::ingest::coops::WindowData;
use crate::ingest::window::Window;
use crate::logging::{self, DataSource};
use crate::model::{CoopsError, StoreError, PROVIDER_TIME_FORMAT};
use crate::store::SharedStore;

// ---------------------------------------------------------------------------
// Provider seam
// ---------------------------------------------------------------------------

/// Source of window data. Implemented by `coops::CoopsClient`; tests supply
/// canned providers.
pub trait Provider {
    /// Fetch and parse one window. Blocks until the request resolves.
    fn fetch_window(&self, window: &Window) -> Result<WindowData, CoopsError>;
}

impl<P: Provider + ?Sized> Provider for &P {
    fn fetch_window(&self, window: &Window) -> Result<WindowData, CoopsError> {
        (**self).fetch_window(window)
    }
}

// ---------------------------------------------------------------------------
// Errors and reporting
// ---------------------------------------------------------------------------

/// Why a single window contributed no records.
#[derive(Debug, PartialEq)]
pub enum IngestError {
    Fetch(CoopsError),
    /// The provider returned a record for a day that was not requested.
    OutsideWindow { timestamp: DateTime<Utc>, window: Window },
    Append(StoreError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Fetch(e) => write!(f, "{}", e),
            IngestError::OutsideWindow { timestamp, window } => write!(
                f,
                "Record at {} lies outside requested window {}",
                timestamp.format(PROVIDER_TIME_FORMAT),
                window
            ),
            IngestError::Append(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<CoopsError> for IngestError {
    fn from(err: CoopsError) -> Self {
        IngestError::Fetch(err)
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Append(err)
    }
}

/// Outcome of a full ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub windows_total: usize,
    pub windows_succeeded: usize,
    pub windows_failed: usize,
    pub records_appended: usize,
    /// Windows whose intervals were left empty, in request order.
    pub failed_windows: Vec<Window>,
}

// ---------------------------------------------------------------------------
// Ingestor
// ---------------------------------------------------------------------------

pub struct Ingestor<P: Provider> {
    provider: P,
    store: SharedStore,
    queue: VecDeque<Window>,
}

impl<P: Provider> Ingestor<P> {
    /// `windows` must be in chronological order, as produced by
    /// `window::plan_windows`.
    pub fn new(provider: P, store: SharedStore, windows: Vec<Window>) -> Self {
        Ingestor {
            provider,
            store,
            queue: windows.into(),
        }
    }

    /// Windows not yet processed.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Process every queued window in order and report what happened.
    pub fn run(mut self) -> IngestReport {
        let mut report = IngestReport {
            windows_total: self.pending(),
            ..IngestReport::default()
        };

        logging::info(
            DataSource::Coops,
            None,
            &format!("Starting ingestion of {} windows", report.windows_total),
        );

        while let Some(window) = self.queue.pop_front() {
            let label = window.to_string();
            match self.ingest_window(&window) {
                Ok(count) => {
                    report.windows_succeeded += 1;
                    report.records_appended += count;
                    logging::debug(
                        DataSource::Coops,
                        Some(&label),
                        &format!("stored {} records", count),
                    );
                }
                Err(err) => {
                    report.windows_failed += 1;
                    report.failed_windows.push(window);
                    match &err {
                        IngestError::Fetch(_) => logging::log_coops_failure(&label, "fetch", &err),
                        IngestError::OutsideWindow { .. } => {
                            logging::log_coops_failure(&label, "validate", &err)
                        }
                        IngestError::Append(_) => logging::warn(
                            DataSource::Store,
                            Some(&label),
                            &format!("Rejected batch: {}", err),
                        ),
                    }
                }
            }
        }

        logging::log_ingest_summary(
            report.windows_total,
            report.windows_succeeded,
            report.windows_failed,
            report.records_appended,
        );

        report
    }

    fn ingest_window(&self, window: &Window) -> Result<usize, IngestError> {
        let data = self.provider.fetch_window(window)?;

        if let Some(stray) = data.records.iter().find(|r| !window.contains(r.timestamp)) {
            return Err(IngestError::OutsideWindow {
                timestamp: stray.timestamp,
                window: *window,
            });
        }

        // Readers only ever wait on the lock for the duration of an append.
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        Ok(store.append(data.records)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
