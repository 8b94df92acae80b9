//! Event Store - durable timeline log
//!
//! The EventStore owns the append-only record log and the materialized
//! [`TimelineState`] rebuilt from it. Every write appends exactly one record
//! line and syncs it before the in-memory state changes.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::types::{
    EventCompletedData, EventRecordedData, EventStatus, EventsRevertedData, LogRecord, RecordType,
    TimelineEvent, WorkflowStep,
};
use crate::utils::{remove_staging_files, AtomicError};

use super::snapshot::SnapshotManager;
use super::state::TimelineState;

/// Configuration for the EventStore
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
    /// Threshold for creating snapshots (number of records)
    pub snapshot_threshold: usize,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            snapshot_threshold: 1000,
        }
    }
}

impl EventStoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Create config with custom data directory (alias for new)
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self::new(data_dir)
    }

    pub fn with_snapshot_threshold(mut self, threshold: usize) -> Self {
        self.snapshot_threshold = threshold.max(1);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to events.jsonl
    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join("events.jsonl")
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn latest_snapshot_path(&self) -> PathBuf {
        self.snapshots_dir().join("latest.jsonl")
    }

    /// Get path to previous snapshot (backup)
    pub fn previous_snapshot_path(&self) -> PathBuf {
        self.snapshots_dir().join("previous.jsonl")
    }
}

/// Result type for EventStore operations
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Errors that can occur in EventStore operations
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event '{0}' not found")]
    EventNotFound(String),
    #[error("Snapshot corrupted: {0}")]
    SnapshotCorrupted(String),
    #[error(transparent)]
    Atomic(#[from] AtomicError),
    #[error("event log could not be rolled back after a failed append; reopen the store")]
    Poisoned,
}

/// Outcome of [`EventStore::commit_reversion`]
#[derive(Debug, Clone)]
pub struct ReversionCommit {
    /// Ids that actually moved to `undone`
    pub undone_event_ids: Vec<String>,
    /// The reversion event as stored
    pub reversion_event: TimelineEvent,
}

/// The EventStore manages the timeline record log and its materialized state
pub struct EventStore {
    config: EventStoreConfig,
    /// Next record sequence to assign
    next_seq: u64,
    /// Number of records since last snapshot
    records_since_snapshot: usize,
    /// Last record sequence included in most recent snapshot
    last_snapshot_seq: u64,
    state: TimelineState,
    /// Set when a failed append could not be cut from the log
    poisoned: bool,
}

impl EventStore {
    /// Open the store, rebuilding state from snapshot + log
    pub fn open(config: EventStoreConfig) -> EventStoreResult<Self> {
        let mut store = Self {
            config,
            next_seq: 1,
            records_since_snapshot: 0,
            last_snapshot_seq: 0,
            state: TimelineState::new(),
            poisoned: false,
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn config(&self) -> &EventStoreConfig {
        &self.config
    }

    /// Get the next record sequence (without incrementing)
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn records_since_snapshot(&self) -> usize {
        self.records_since_snapshot
    }

    pub fn last_snapshot_seq(&self) -> u64 {
        self.last_snapshot_seq
    }

    /// Check if snapshot should be created
    pub fn should_snapshot(&self) -> bool {
        self.records_since_snapshot >= self.config.snapshot_threshold
    }

    pub(crate) fn state(&self) -> &TimelineState {
        &self.state
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    pub fn get(&self, event_id: &str) -> Option<&TimelineEvent> {
        self.state.get(event_id)
    }

    /// Look up an event, failing with `EventNotFound`
    pub fn find(&self, event_id: &str) -> EventStoreResult<&TimelineEvent> {
        self.state
            .get(event_id)
            .ok_or_else(|| EventStoreError::EventNotFound(event_id.to_string()))
    }

    /// Events of a session ordered by `(step, startTime)`
    pub fn session_events(&self, session_id: &str) -> Vec<TimelineEvent> {
        self.state
            .session_events(session_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Distinct session ids of a user
    pub fn user_sessions(&self, user_id: &str) -> Vec<String> {
        self.state
            .user_sessions(user_id)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Events of a user narrowed by step and/or status
    pub fn query(
        &self,
        user_id: &str,
        step: Option<WorkflowStep>,
        status: Option<EventStatus>,
    ) -> Vec<&TimelineEvent> {
        self.state.query(user_id, step, status)
    }

    pub fn event_count(&self) -> usize {
        self.state.len()
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    /// Append a new event
    pub fn insert_event(&mut self, mut event: TimelineEvent) -> EventStoreResult<TimelineEvent> {
        event.seq = self.next_seq;
        let user = event.user_id.clone();
        let data = serde_json::to_value(EventRecordedData {
            event: event.clone(),
        })?;

        self.append(RecordType::EventRecorded, user, data)?;
        Ok(event)
    }

    /// Store the final status of an event
    ///
    /// `metadata` is the already-merged metadata object.
    pub fn complete_event(
        &mut self,
        event_id: &str,
        status: EventStatus,
        end_time: chrono::DateTime<chrono::Utc>,
        duration: i64,
        details: Value,
        metadata: Value,
    ) -> EventStoreResult<TimelineEvent> {
        let user = self.find(event_id)?.user_id.clone();
        let data = serde_json::to_value(EventCompletedData {
            event_id: event_id.to_string(),
            status,
            end_time,
            duration,
            details,
            metadata,
        })?;

        self.append(RecordType::EventCompleted, user, data)?;
        Ok(self.find(event_id)?.clone())
    }

    /// Atomically mark `candidates` undone and append `reversion_event`
    ///
    /// Only candidates whose current status may move to `undone` are
    /// included; the rest are left alone and not reported. Both halves go to
    /// the log as one record, so after a crash either all of them are applied
    /// on replay or none are.
    pub fn commit_reversion(
        &mut self,
        target_event_id: &str,
        candidates: &[String],
        mut reversion_event: TimelineEvent,
    ) -> EventStoreResult<ReversionCommit> {
        self.find(target_event_id)?;

        let undone_event_ids: Vec<String> = candidates
            .iter()
            .filter(|id| {
                self.state
                    .get(id)
                    .map(|e| e.status.can_transition_to(EventStatus::Undone))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        reversion_event.seq = self.next_seq;
        let user = reversion_event.user_id.clone();
        let data = serde_json::to_value(EventsRevertedData {
            target_event_id: target_event_id.to_string(),
            undone_event_ids: undone_event_ids.clone(),
            reversion_event: reversion_event.clone(),
        })?;

        self.append(RecordType::EventsReverted, user, data)?;

        Ok(ReversionCommit {
            undone_event_ids,
            reversion_event,
        })
    }

    /// Write one record durably, then apply it
    ///
    /// A record that cannot be synced or applied is cut from the log again,
    /// so a reported failure stays a failure after replay.
    fn append(
        &mut self,
        record_type: RecordType,
        user: String,
        data: Value,
    ) -> EventStoreResult<LogRecord> {
        if self.poisoned {
            return Err(EventStoreError::Poisoned);
        }

        let record = LogRecord::new(record_type, self.next_seq, user, data);
        let log_len = self.write_record(&record)?;

        if let Err(e) = self.state.apply(&record) {
            self.truncate_log(log_len);
            return Err(e);
        }
        self.next_seq = record.seq + 1;
        self.records_since_snapshot += 1;

        tracing::debug!(seq = record.seq, record_type = %record.record_type, "appended timeline record");

        if self.should_snapshot() {
            if let Err(e) = self.snapshot() {
                // The record itself is durable; the next write retries.
                tracing::warn!(error = %e, "timeline snapshot failed");
            }
        }

        Ok(record)
    }

    /// Append and sync one line, returning the log length before it
    fn write_record(&mut self, record: &LogRecord) -> EventStoreResult<u64> {
        let events_path = self.config.events_path();

        if let Some(parent) = events_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = record.to_json_line()?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)?;
        let log_len = file.metadata()?.len();

        // One write call per record keeps a torn write confined to the last line
        let written = file.write_all(line.as_bytes()).and_then(|()| file.sync_all());
        if let Err(e) = written {
            drop(file);
            self.truncate_log(log_len);
            return Err(e.into());
        }

        Ok(log_len)
    }

    /// Cut the log back to `len` bytes, poisoning the store if that fails
    fn truncate_log(&mut self, len: u64) {
        let path = self.config.events_path();
        let result = OpenOptions::new()
            .write(true)
            .open(&path)
            .and_then(|file| {
                file.set_len(len)?;
                file.sync_all()
            });

        if let Err(e) = result {
            tracing::error!(error = %e, len, "could not roll back timeline log; refusing further writes");
            self.poisoned = true;
        }
    }

    /// Drop a partial record at the end of the log
    ///
    /// Without this the next append would be glued onto the fragment and
    /// both would be unreadable on the following replay.
    fn repair_torn_tail(&mut self) -> EventStoreResult<()> {
        let path = self.config.events_path();
        if !path.exists() {
            return Ok(());
        }

        let bytes = std::fs::read(&path)?;
        if bytes.last().map_or(true, |&b| b == b'\n') {
            return Ok(());
        }

        let keep = bytes
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        let file = OpenOptions::new().write(true).open(&path)?;
        file.set_len(keep as u64)?;
        file.sync_all()?;

        tracing::warn!(
            dropped_bytes = bytes.len() - keep,
            "truncated torn record at end of timeline log"
        );
        Ok(())
    }

    /// Write a snapshot of the current state
    pub fn snapshot(&mut self) -> EventStoreResult<()> {
        let last_seq = self.next_seq.saturating_sub(1);
        SnapshotManager::new(self.config.clone()).create_snapshot(last_seq, self.state.events())?;
        self.last_snapshot_seq = last_seq;
        self.records_since_snapshot = 0;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// Load all records from the log
    ///
    /// Lines that fail to parse (a torn final write) are skipped.
    pub fn load_records(&self) -> EventStoreResult<Vec<LogRecord>> {
        let events_path = self.config.events_path();

        if !events_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&events_path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }

            match LogRecord::from_json_line(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(line = line_num + 1, error = %e, "skipping unreadable timeline record");
                }
            }
        }

        Ok(records)
    }

    /// Load records after a specific sequence number
    pub fn load_records_after(&self, after_seq: u64) -> EventStoreResult<Vec<LogRecord>> {
        Ok(self
            .load_records()?
            .into_iter()
            .filter(|r| r.seq > after_seq)
            .collect())
    }

    /// Rebuild state: latest snapshot (or its backup), then the log tail
    fn initialize(&mut self) -> EventStoreResult<()> {
        remove_staging_files(self.config.snapshots_dir())?;

        let manager = SnapshotManager::new(self.config.clone());
        let snapshot = match manager.load_latest() {
            Ok(snapshot) => snapshot,
            Err(EventStoreError::SnapshotCorrupted(reason)) => {
                tracing::warn!(%reason, "latest timeline snapshot is corrupted");
                manager.load_previous()?
            }
            Err(e) => return Err(e),
        };

        let after_seq = match snapshot {
            Some((meta, events)) => {
                self.state = TimelineState::from_events(events);
                self.last_snapshot_seq = meta.last_seq;
                meta.last_seq
            }
            None => 0,
        };

        self.repair_torn_tail()?;
        let records = self.load_records_after(after_seq)?;
        let mut max_seq = after_seq;
        for record in &records {
            if let Err(e) = self.state.apply(record) {
                tracing::warn!(seq = record.seq, error = %e, "skipping timeline record with bad payload");
            }
            max_seq = max_seq.max(record.seq);
        }

        self.next_seq = max_seq + 1;
        self.records_since_snapshot = records.len();

        tracing::info!(
            snapshot_seq = after_seq,
            replayed = records.len(),
            events = self.state.len(),
            "timeline store opened"
        );

        Ok(())
    }
}
