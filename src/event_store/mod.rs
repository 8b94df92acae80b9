//! Event Store Module
//!
//! Durable storage for the workflow timeline:
//! - `EventStore`: append-only record log plus the state replayed from it
//! - `SnapshotManager`: snapshot creation and loading
//! - `EventStoreStats`: storage figures for health reporting
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌─────────┐    ┌─────────────────┐    ┌─────────────┐    ┌──────────────────┐
//! │ Service │───►│ append + fsync  │───►│ apply to    │───►│ maybe snapshot   │
//! │ call    │    │ events.jsonl    │    │ state       │    │ every N records  │
//! └─────────┘    └─────────────────┘    └─────────────┘    └──────────────────┘
//!
//! Read Path (Startup):
//! ┌───────────────┐    ┌─────────────────┐
//! │ Load snapshot │───►│ Replay records  │───► Ready!
//! │ (latest.jsonl)│    │ after snapshot  │
//! └───────────────┘    └─────────────────┘
//! ```

mod snapshot;
mod state;
mod stats;
mod store;

pub use snapshot::SnapshotManager;
pub use state::TimelineState;
pub use stats::EventStoreStats;
pub use store::{EventStore, EventStoreConfig, EventStoreError, EventStoreResult, ReversionCommit};
