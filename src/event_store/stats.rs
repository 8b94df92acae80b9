//! Event Store Statistics
//!
//! Storage-level figures about the timeline log: event counts by status,
//! file sizes and snapshot progress.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use super::store::{EventStore, EventStoreResult};

/// Statistics about the Event Store
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStoreStats {
    /// Number of timeline events held in memory
    pub event_count: usize,
    /// Events per status, keyed by the status name
    pub events_by_status: BTreeMap<String, usize>,
    /// Size of events.jsonl in bytes
    pub log_size: u64,
    /// Size of the latest snapshot in bytes
    pub snapshot_size: u64,
    pub last_seq: u64,
    pub last_snapshot_seq: u64,
    pub records_since_snapshot: usize,
}

impl EventStoreStats {
    /// Collect statistics for an open store
    pub fn collect(store: &EventStore) -> EventStoreResult<Self> {
        let config = store.config();

        let events_by_status = store
            .state()
            .status_counts()
            .into_iter()
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect();

        Ok(Self {
            event_count: store.event_count(),
            events_by_status,
            log_size: file_size(&config.events_path())?,
            snapshot_size: file_size(&config.latest_snapshot_path())?,
            last_seq: store.next_seq().saturating_sub(1),
            last_snapshot_seq: store.last_snapshot_seq(),
            records_since_snapshot: store.records_since_snapshot(),
        })
    }
}

fn file_size(path: &Path) -> EventStoreResult<u64> {
    if !path.exists() {
        return Ok(0);
    }
    Ok(fs::metadata(path)?.len())
}
