//! Error taxonomy of the timeline engine

use crate::event_store::EventStoreError;
use crate::types::EventStatus;

/// Result type for timeline operations
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Errors returned by the step recorder, the reversion engine and the
/// timeline read paths
///
/// Everything except [`TimelineError::Storage`] is detected before any
/// mutation takes place.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("timeline event '{0}' not found")]
    EventNotFound(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("unknown workflow step '{0}'")]
    InvalidStep(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("event '{event_id}' is {status}; only completed events can be reverted to")]
    InvalidRevertTarget { event_id: String, status: EventStatus },

    #[error("event '{event_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        event_id: String,
        from: EventStatus,
        to: EventStatus,
    },

    #[error("storage failure: {0}")]
    Storage(#[source] EventStoreError),
}

impl From<EventStoreError> for TimelineError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::EventNotFound(id) => TimelineError::EventNotFound(id),
            other => TimelineError::Storage(other),
        }
    }
}

impl TimelineError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TimelineError::EventNotFound(_) | TimelineError::SessionNotFound(_) => "NOT_FOUND",
            TimelineError::Forbidden(_) => "FORBIDDEN",
            TimelineError::InvalidStep(_) => "INVALID_STEP",
            TimelineError::InvalidInput(_) => "INVALID_INPUT",
            TimelineError::InvalidRevertTarget { .. } => "INVALID_REVERT_TARGET",
            TimelineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            TimelineError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    /// Whether the caller sent a request that can never succeed as is
    pub fn is_client_error(&self) -> bool {
        !matches!(self, TimelineError::Storage(_))
    }
}
