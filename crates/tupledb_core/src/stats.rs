//! Write path counters.
//!
//! All counters are atomic and can be read while writes are in progress.

use crate::error::WriteError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a [`crate::TupleWriter`].
#[derive(Debug, Default)]
pub struct WriteStats {
    /// Calls that committed.
    writes_committed: AtomicU64,
    /// Calls rejected by a precondition.
    preconditions_failed: AtomicU64,
    /// Calls that failed fatally.
    writes_failed: AtomicU64,
    /// Live rows closed by committed calls.
    rows_closed: AtomicU64,
    /// Rows inserted by committed calls.
    rows_inserted: AtomicU64,
    /// Multi-row inserts issued by committed calls.
    bulk_inserts: AtomicU64,
}

impl WriteStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_commit(&self, rows_closed: u64, rows_inserted: u64, bulk_inserts: u64) {
        self.writes_committed.fetch_add(1, Ordering::Relaxed);
        self.rows_closed.fetch_add(rows_closed, Ordering::Relaxed);
        self.rows_inserted.fetch_add(rows_inserted, Ordering::Relaxed);
        self.bulk_inserts.fetch_add(bulk_inserts, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, err: &WriteError) {
        let counter = match err {
            WriteError::PreconditionFailed { .. } => &self.preconditions_failed,
            WriteError::WriteFailed { .. } => &self.writes_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of committed calls.
    pub fn writes_committed(&self) -> u64 {
        self.writes_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of precondition conflicts.
    pub fn preconditions_failed(&self) -> u64 {
        self.preconditions_failed.load(Ordering::Relaxed)
    }

    /// Returns the number of fatal failures.
    pub fn writes_failed(&self) -> u64 {
        self.writes_failed.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> WriteStatsSnapshot {
        WriteStatsSnapshot {
            writes_committed: self.writes_committed(),
            preconditions_failed: self.preconditions_failed(),
            writes_failed: self.writes_failed(),
            rows_closed: self.rows_closed.load(Ordering::Relaxed),
            rows_inserted: self.rows_inserted.load(Ordering::Relaxed),
            bulk_inserts: self.bulk_inserts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`WriteStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteStatsSnapshot {
    /// Calls that committed.
    pub writes_committed: u64,
    /// Calls rejected by a precondition.
    pub preconditions_failed: u64,
    /// Calls that failed fatally.
    pub writes_failed: u64,
    /// Live rows closed.
    pub rows_closed: u64,
    /// Rows inserted.
    pub rows_inserted: u64,
    /// Multi-row inserts issued.
    pub bulk_inserts: u64,
}
