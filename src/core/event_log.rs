use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use time::OffsetDateTime;

use crate::core::authorization::Decision;
use crate::models::PlateText;

/// One audit entry per processed image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Serialized as `null` when nothing was recognized
    pub plate: PlateText,
    pub decision: Decision,
}

impl EventRecord {
    /// Stamp a record with the current wall-clock time, second precision
    pub fn now(plate: PlateText, decision: Decision) -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self {
            timestamp: now.replace_nanosecond(0).unwrap_or(now),
            plate,
            decision,
        }
    }
}

/// Session-scoped, append-only history of decisions.
///
/// Appends are serialized behind a mutex so insertion order is call order even
/// with concurrent callers. Snapshots are copies and never see later appends.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Mutex<Vec<EventRecord>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Never rejects and never deduplicates.
    pub fn record(&self, entry: EventRecord) {
        // A poisoned lock still guards a consistent Vec: pushes are the only writes
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Copy of every record so far, in insertion order
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dashboard counts derived from a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub total: usize,
    pub authorized: usize,
    pub denied: usize,
    pub not_found: usize,
}

impl EventSummary {
    pub fn from_records(records: &[EventRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total += 1;
            match record.decision {
                Decision::Authorized => summary.authorized += 1,
                Decision::Denied => summary.denied += 1,
                Decision::NotFound => summary.not_found += 1,
            }
            summary
        })
    }
}
