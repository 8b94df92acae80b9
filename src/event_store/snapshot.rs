//! Timeline snapshots
//!
//! A snapshot is a JSONL file whose first line is a [`SnapshotMeta`] header
//! and whose remaining lines are the timeline events as of `last_seq`.
//! Startup loads it and replays only the log records after that sequence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::types::{SnapshotMeta, TimelineEvent};
use crate::utils::atomic_replace;

use super::store::{EventStoreConfig, EventStoreError, EventStoreResult};

/// A loaded snapshot
pub type Snapshot = (SnapshotMeta, Vec<TimelineEvent>);

pub struct SnapshotManager {
    config: EventStoreConfig,
}

impl SnapshotManager {
    pub fn new(config: EventStoreConfig) -> Self {
        Self { config }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.config.latest_snapshot_path()
    }

    pub fn previous_path(&self) -> PathBuf {
        self.config.previous_snapshot_path()
    }

    /// Write a snapshot of `events`; the one it replaces becomes the backup
    pub fn create_snapshot<'a, I>(&self, last_seq: u64, events: I) -> EventStoreResult<SnapshotMeta>
    where
        I: IntoIterator<Item = &'a TimelineEvent>,
    {
        let mut body = String::new();
        let mut count = 0;
        for event in events {
            body.push_str(&serde_json::to_string(event)?);
            body.push('\n');
            count += 1;
        }

        let meta = SnapshotMeta::new(last_seq, count);
        let content = format!("{}\n{}", meta.to_json_line()?, body);

        let previous = self.previous_path();
        atomic_replace(&self.latest_path(), content.as_bytes(), Some(previous.as_path()))?;

        tracing::info!(events = count, last_seq, "created timeline snapshot");
        Ok(meta)
    }

    /// The latest snapshot, if one has been written
    pub fn load_latest(&self) -> EventStoreResult<Option<Snapshot>> {
        read_if_present(&self.latest_path())
    }

    /// The snapshot before the latest one
    pub fn load_previous(&self) -> EventStoreResult<Option<Snapshot>> {
        let snapshot = read_if_present(&self.previous_path())?;
        if snapshot.is_some() {
            tracing::warn!(path = %self.previous_path().display(), "recovering timeline from backup snapshot");
        }
        Ok(snapshot)
    }
}

fn read_if_present(path: &Path) -> EventStoreResult<Option<Snapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    read_snapshot(path).map(Some)
}

/// Parse a snapshot file; any malformed or missing line makes it corrupted
fn read_snapshot(path: &Path) -> EventStoreResult<Snapshot> {
    let corrupted = |line: usize, reason: String| {
        EventStoreError::SnapshotCorrupted(format!("{} line {}: {}", path.display(), line, reason))
    };

    let mut lines = BufReader::new(File::open(path)?).lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(corrupted(1, "empty file".to_string())),
    };
    let meta = SnapshotMeta::from_json_line(&header).map_err(|e| corrupted(1, e.to_string()))?;

    let mut events = Vec::with_capacity(meta.event_count);
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str::<TimelineEvent>(&line)
            .map_err(|e| corrupted(idx + 2, e.to_string()))?;
        events.push(event);
    }

    if events.len() != meta.event_count {
        return Err(corrupted(
            events.len() + 1,
            format!("header promises {} events", meta.event_count),
        ));
    }

    Ok((meta, events))
}
