//! Concurrent append-only telemetry log.
//!
//! The store is the only truly shared mutable state in the system: every
//! connection handler appends to it, the persistence scheduler snapshots and
//! drains it, and historical search reads it. Access goes through the
//! [`TelemetryLog`] trait so the locking strategy can change (shard by
//! sensor id, lock-free append log) without touching callers.
//!
//! The reference implementation, [`InMemoryLog`], guards both sequences with
//! a single `Mutex`. Two invariants hold under the lock:
//! - the main sequence is append-only in arrival order;
//! - every record pending export is also present in the main sequence, until
//!   a drain removes it from the batch (and only from the batch).
//!
//! No operation holds the lock longer than an O(n) copy, and the lock is
//! never held across I/O.

use std::sync::Mutex;

use crate::record::SensorRecord;

/// Shared record log interface.
pub trait TelemetryLog: Send + Sync {
    /// Append one record to the main sequence and the pending export batch.
    /// Always succeeds.
    fn append(&self, record: SensorRecord);

    /// Independent full copy of the main sequence, in insertion order.
    ///
    /// The copy is a consistent point-in-time view: a record appended after
    /// this call returns is never partially visible in it.
    fn snapshot(&self) -> Vec<SensorRecord>;

    /// Atomically remove and return all records pending export.
    ///
    /// Returns an empty vec when nothing is pending. Each record is handed to
    /// at most one export cycle.
    fn drain_export_batch(&self) -> Vec<SensorRecord>;

    /// Replace the main sequence wholesale. Startup only; the export batch is
    /// untouched.
    fn load(&self, records: Vec<SensorRecord>);

    /// Number of records in the main sequence.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct LogState {
    records: Vec<SensorRecord>,
    export_batch: Vec<SensorRecord>,
}

/// Single-mutex in-memory log — the correctness baseline.
#[derive(Default)]
pub struct InMemoryLog {
    state: Mutex<LogState>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetryLog for InMemoryLog {
    fn append(&self, record: SensorRecord) {
        let mut state = self.state.lock().unwrap();
        state.records.push(record.clone());
        state.export_batch.push(record);
    }

    fn snapshot(&self) -> Vec<SensorRecord> {
        self.state.lock().unwrap().records.clone()
    }

    fn drain_export_batch(&self) -> Vec<SensorRecord> {
        std::mem::take(&mut self.state.lock().unwrap().export_batch)
    }

    fn load(&self, records: Vec<SensorRecord>) {
        self.state.lock().unwrap().records = records;
    }

    fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }
}
