//! Record sink implementations.
//!
//! Finished requests are reported as [`RequestRecord`]s. The scheduler keeps only
//! aggregate counters; anything that wants per-request latency (run summaries,
//! threshold checks) attaches a sink.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::RequestRecord;

/// Record sink abstraction.
pub trait RecordSink: Send + Sync {
    /// Record a finished request.
    fn record(&self, record: RequestRecord);
}

/// In-memory sink keeping the most recent records in a bounded buffer.
pub struct InMemoryRecordSink {
    records: Mutex<VecDeque<RequestRecord>>,
    max_records: usize,
}

impl InMemoryRecordSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records.min(1024))),
            max_records,
        }
    }

    /// Retrieve a snapshot of stored records, oldest first.
    pub fn records(&self) -> Vec<RequestRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all stored records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl RecordSink for InMemoryRecordSink {
    fn record(&self, record: RequestRecord) {
        if self.max_records == 0 {
            return;
        }
        let mut records = self.records.lock();
        if records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record);
    }
}
