//! Data types for the workflow timeline
//!
//! This module contains all the core data structures used throughout the application.

mod record;
mod revert;
mod status;
mod step;
mod summary;
mod timeline_event;

pub use record::{
    EventCompletedData, EventRecordedData, EventsRevertedData, LogRecord, RecordType,
    SnapshotMeta,
};
pub use revert::{CascadeWarning, RevertResponse, RevertResult};
pub use status::EventStatus;
pub use step::{StepInfo, WorkflowStep};
pub use summary::{
    percentage, SessionSummary, Statistics, StepDurationStats, StepSuccessRate,
};
pub use timeline_event::{EventView, TimelineEvent, REVERSION_FLAG};

/// Check if value is zero (for skip_serializing_if)
pub fn is_zero(val: &u64) -> bool {
    *val == 0
}
