//! Log record types for the append-only timeline log
//!
//! Every mutation of the timeline is written as one record line in
//! `events.jsonl`. The in-memory timeline state is derived by replaying the
//! records in sequence order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventStatus, TimelineEvent};

/// Kinds of record that can appear in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// A new event was created (started, or logged in one shot)
    EventRecorded,
    /// A running event was completed or failed
    EventCompleted,
    /// A set of events was marked undone and a reversion event appended
    EventsReverted,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::EventRecorded => write!(f, "event_recorded"),
            RecordType::EventCompleted => write!(f, "event_completed"),
            RecordType::EventsReverted => write!(f, "events_reverted"),
        }
    }
}

/// Payload for EventRecorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecordedData {
    pub event: TimelineEvent,
}

/// Payload for EventCompleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCompletedData {
    pub event_id: String,
    pub status: EventStatus,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    pub details: serde_json::Value,
    /// Metadata after merging
    pub metadata: serde_json::Value,
}

/// Payload for EventsReverted
///
/// Holds both halves of a reversion so that they become durable in a single
/// line write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsRevertedData {
    pub target_event_id: String,
    pub undone_event_ids: Vec<String>,
    pub reversion_event: TimelineEvent,
}

/// One line of the timeline log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "recordType")]
    pub record_type: RecordType,

    /// Monotonic sequence number assigned by the store
    pub seq: u64,

    /// Unix timestamp (milliseconds) when the record was written
    #[serde(rename = "ts")]
    pub timestamp: i64,

    /// Owner of the affected events
    pub user: String,

    pub data: serde_json::Value,
}

impl LogRecord {
    pub fn new(record_type: RecordType, seq: u64, user: String, data: serde_json::Value) -> Self {
        Self {
            record_type,
            seq,
            timestamp: crate::utils::current_timestamp_millis(),
            user,
            data,
        }
    }

    /// Parse the record data as a specific payload type
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    /// Serialize record to JSON string (for JSONL)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize record from JSON string
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Snapshot metadata - first line in snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Always "snapshot_meta" to identify this as metadata
    #[serde(rename = "type")]
    pub meta_type: String,

    /// Last record sequence included in this snapshot
    pub last_seq: u64,

    /// Unix timestamp (milliseconds) when snapshot was created
    pub created_at: i64,

    pub event_count: usize,

    /// Version of snapshot format
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl SnapshotMeta {
    pub fn new(last_seq: u64, event_count: usize) -> Self {
        Self {
            meta_type: "snapshot_meta".to_string(),
            last_seq,
            created_at: crate::utils::current_timestamp_millis(),
            event_count,
            version: 1,
        }
    }

    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
