/// Fixed-cadence, append-only record store.
///
/// Records are kept in a flat vector where position *is* the key: slot `i`
/// holds the sample for `epoch + i * 6 minutes`. Resolving a timestamp is a
/// single subtraction and division, so lookups are constant time.
///
/// # Ordering
/// `append` only ever extends the tail. Every record is placed at the slot
/// computed from its own timestamp; positions skipped between the current
/// tail and that slot (a failed window, a provider omission) become empty
/// slots. A batch that would write at or before an existing slot is
/// rejected whole with `StoreError::OutOfOrderAppend`.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::model::{Record, StoreError, INTERVAL_MINUTES};

/// Interval length in milliseconds, the unit index arithmetic is done in.
const INTERVAL_MS: i64 = INTERVAL_MINUTES * 60 * 1000;

/// Store handle shared between the ingestion thread (single writer) and
/// the query handlers.
pub type SharedStore = Arc<RwLock<IntervalStore>>;

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalStore {
    epoch: DateTime<Utc>,
    slots: Vec<Option<Record>>,
    /// Upper bound on `slots.len()`, if any.
    capacity: Option<usize>,
}

impl IntervalStore {
    /// Empty store whose slot 0 starts at `epoch`.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        IntervalStore {
            epoch,
            slots: Vec::new(),
            capacity: None,
        }
    }

    /// Empty store anchored at 00:00 UTC on January 1st of `year`, holding
    /// at most that year's intervals.
    /// Returns `None` if the year is outside chrono's representable range.
    pub fn for_year(year: i32) -> Option<Self> {
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
        let next = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?;
        let capacity = usize::try_from((next - start).num_minutes() / INTERVAL_MINUTES).ok()?;
        Some(IntervalStore {
            capacity: Some(capacity),
            ..IntervalStore::new(start)
        })
    }

    /// Wrap the store for sharing between the ingestor and the server.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Number of slots, occupied or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of slots, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of slots holding a record.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Start instant of slot `index`.
    pub fn slot_start(&self, index: i64) -> DateTime<Utc> {
        self.epoch + Duration::minutes(index * INTERVAL_MINUTES)
    }

    /// `floor((timestamp - epoch) / 6 minutes)`.
    ///
    /// Any instant inside `[slot_start, slot_start + 6min)` maps to that
    /// slot, so a query resolves to the interval at or before the requested
    /// time. Instants before the epoch give negative indexes. No bounds
    /// check is made.
    pub fn index_for(&self, timestamp: DateTime<Utc>) -> i64 {
        (timestamp - self.epoch)
            .num_milliseconds()
            .div_euclid(INTERVAL_MS)
    }

    fn is_aligned(&self, timestamp: DateTime<Utc>) -> bool {
        let offset = timestamp - self.epoch;
        offset.num_milliseconds().rem_euclid(INTERVAL_MS) == 0
            && offset.subsec_nanos() % 1_000_000 == 0
    }

    /// Record stored for the interval containing `timestamp`.
    ///
    /// Returns `None` before the epoch, past the last slot, and for empty
    /// slots alike; a miss is an ordinary result, not an error.
    pub fn lookup(&self, timestamp: DateTime<Utc>) -> Option<&Record> {
        let index = usize::try_from(self.index_for(timestamp)).ok()?;
        self.slots.get(index)?.as_ref()
    }

    /// Append `records`, which must be in strictly increasing interval order
    /// and start after the current tail.
    ///
    /// The whole batch is validated before anything is written. Returns the
    /// number of records stored.
    pub fn append(&mut self, records: Vec<Record>) -> Result<usize, StoreError> {
        let mut next = self.slots.len() as i64;
        let mut indexes = Vec::with_capacity(records.len());

        for record in &records {
            if !self.is_aligned(record.timestamp) {
                return Err(StoreError::Misaligned {
                    timestamp: record.timestamp,
                });
            }
            let index = self.index_for(record.timestamp);
            if index < next {
                return Err(StoreError::OutOfOrderAppend {
                    index,
                    len: self.slots.len(),
                });
            }
            if let Some(capacity) = self.capacity {
                if index >= capacity as i64 {
                    return Err(StoreError::BeyondCapacity {
                        timestamp: record.timestamp,
                        capacity,
                    });
                }
            }
            indexes.push(index as usize);
            next = index + 1;
        }

        let count = records.len();
        for (index, record) in indexes.into_iter().zip(records) {
            if index > self.slots.len() {
                self.slots.resize_with(index, || None);
            }
            self.slots.push(Some(record));
        }

        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
