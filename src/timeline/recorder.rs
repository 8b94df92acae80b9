//! Step recorder - creating sessions and recording step events

use chrono::Duration;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{TimelineError, TimelineResult};
use crate::types::{EventStatus, TimelineEvent, WorkflowStep};

use super::TimelineService;

/// Fields shared by starting and logging a step
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub session_id: String,
    pub step_key: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub transformation_id: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Body of a step completion
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteInput {
    /// Replaces the event details when present
    #[serde(default)]
    pub details: Option<Value>,
    /// `completed` (default) or `failed`
    #[serde(default)]
    pub status: Option<EventStatus>,
    /// Shallow-merged into the event metadata
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// A step that already finished, recorded in one call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogStepInput {
    #[serde(flatten)]
    pub step: StepInput,
    /// Milliseconds; the event is back-dated by this much
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub status: Option<EventStatus>,
}

/// Allocate a fresh session id
///
/// Nothing is stored until the first step is recorded.
pub fn create_session(_svc: &TimelineService, user_id: &str) -> String {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(user = user_id, session = %session_id, "session created");
    session_id
}

/// Record the start of a step
pub fn start_step(
    svc: &TimelineService,
    user_id: &str,
    input: StepInput,
) -> TimelineResult<TimelineEvent> {
    let step = WorkflowStep::from_key(&input.step_key)?;

    let lock = svc.locks.lock_for(&input.session_id);
    let _guard = lock.lock();
    ensure_session_owner(svc, user_id, &input.session_id)?;

    let event = build_event(user_id, step, svc.clock.now(), input);
    let event = svc.store.write().insert_event(event)?;

    tracing::debug!(event_id = %event.id, step = %event.step, session = %event.session_id, "step started");
    Ok(event)
}

/// Finish a step as `completed` or `failed`
pub fn complete_step(
    svc: &TimelineService,
    user_id: &str,
    event_id: &str,
    input: CompleteInput,
) -> TimelineResult<TimelineEvent> {
    let session_id = {
        let store = svc.store.read();
        let event = store.find(event_id)?;
        if event.user_id != user_id {
            return Err(TimelineError::Forbidden(format!(
                "event '{}' belongs to another user",
                event_id
            )));
        }
        event.session_id.clone()
    };

    let lock = svc.locks.lock_for(&session_id);
    let _guard = lock.lock();

    // Re-read under the session lock; a revert may have run in between
    let mut event = svc.store.read().find(event_id)?.clone();
    let status = input.status.unwrap_or(EventStatus::Completed);
    if !status.is_completion() || !event.status.can_transition_to(status) {
        return Err(TimelineError::InvalidTransition {
            event_id: event_id.to_string(),
            from: event.status,
            to: status,
        });
    }

    event.finish(status, svc.clock.now());
    if let Some(details) = input.details {
        event.details = details;
    }
    if let Some(metadata) = input.metadata {
        event.merge_metadata(metadata);
    }

    let end_time = event.end_time.unwrap_or(event.start_time);
    let event = svc.store.write().complete_event(
        event_id,
        status,
        end_time,
        event.duration,
        event.details,
        event.metadata,
    )?;

    tracing::debug!(event_id, status = %status, duration = event.duration, "step finished");
    Ok(event)
}

/// Record a step that already ran, ending now
pub fn log_step(
    svc: &TimelineService,
    user_id: &str,
    input: LogStepInput,
) -> TimelineResult<TimelineEvent> {
    let step = WorkflowStep::from_key(&input.step.step_key)?;
    let status = input.status.unwrap_or(EventStatus::Completed);
    if !status.is_completion() {
        return Err(TimelineError::InvalidTransition {
            event_id: String::new(),
            from: EventStatus::InProgress,
            to: status,
        });
    }

    let lock = svc.locks.lock_for(&input.step.session_id);
    let _guard = lock.lock();
    ensure_session_owner(svc, user_id, &input.step.session_id)?;

    let end_time = svc.clock.now();
    let duration = input.duration.unwrap_or(0).max(0);
    let start_time = Duration::try_milliseconds(duration)
        .and_then(|d| end_time.checked_sub_signed(d))
        .ok_or_else(|| {
            TimelineError::InvalidInput(format!("duration of {} ms is out of range", duration))
        })?;

    let mut event = build_event(user_id, step, start_time, input.step);
    event.finish(status, end_time);
    let event = svc.store.write().insert_event(event)?;

    tracing::debug!(event_id = %event.id, step = %event.step, status = %status, "step logged");
    Ok(event)
}

fn build_event(
    user_id: &str,
    step: WorkflowStep,
    start_time: chrono::DateTime<chrono::Utc>,
    input: StepInput,
) -> TimelineEvent {
    let mut event = TimelineEvent::new(user_id, input.session_id, step, start_time)
        .with_dataset(input.dataset_id)
        .with_transformation(input.transformation_id);
    if let Some(details) = input.details {
        event = event.with_details(details);
    }
    if let Some(metadata) = input.metadata {
        event.merge_metadata(metadata);
    }
    event
}

/// Reject writes into a session that another user already owns
pub(super) fn ensure_session_owner(
    svc: &TimelineService,
    user_id: &str,
    session_id: &str,
) -> TimelineResult<()> {
    let store = svc.store.read();
    let foreign = store
        .state()
        .session_events(session_id)
        .iter()
        .any(|e| e.user_id != user_id);

    if foreign {
        return Err(TimelineError::Forbidden(format!(
            "session '{}' belongs to another user",
            session_id
        )));
    }
    Ok(())
}
