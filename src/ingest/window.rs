/// Request window planning.
///
/// CO-OPS caps six-minute requests at 31 days, so a year is fetched as a
/// sequence of windows. Both ends of a window are inclusive whole days in the
/// provider's `YYYYMMDD` form; the next window starts the day after the
/// previous one ended, so no day is requested twice and none is skipped.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Provider request limit for six-minute data, in days.
pub const MAX_WINDOW_DAYS: i64 = 31;

/// One inclusive day range submitted as a single provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    /// `begin_date` query value.
    pub fn begin_param(&self) -> String {
        self.begin.format("%Y%m%d").to_string()
    }

    /// `end_date` query value.
    pub fn end_param(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }

    /// Number of days requested, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.begin).num_days() + 1
    }

    /// Instants the window covers: `[begin 00:00, end + 1 day 00:00)` UTC.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.from_utc_datetime(&self.begin.and_time(NaiveTime::MIN));
        let end = Utc.from_utc_datetime(&self.end.and_time(NaiveTime::MIN)) + Duration::days(1);
        (start, end)
    }

    /// Whether `timestamp` falls on one of the window's days.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds();
        start <= timestamp && timestamp < end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.begin_param(), self.end_param())
    }
}

/// Ingestion range for a calendar year: `[Y-01-01T00:00:00Z, Y-12-31T23:59:59.999Z]`.
pub fn year_range(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
    let next = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?;
    Some((start, next - Duration::milliseconds(1)))
}

/// Split `[range_start, range_end]` into successive request windows.
///
/// Each window ends `span_days` after its cursor, clipped to `range_end`;
/// the cursor then moves one day past the window end because the provider's
/// end date is inclusive.
pub fn plan_windows(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    span_days: i64,
) -> Vec<Window> {
    let span = Duration::days(span_days.max(0));
    let mut windows = Vec::new();
    let mut cursor = range_start;

    while cursor < range_end {
        let window_end = (cursor + span).min(range_end);
        windows.push(Window {
            begin: cursor.date_naive(),
            end: window_end.date_naive(),
        });
        cursor = window_end + Duration::days(1);
    }

    windows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
