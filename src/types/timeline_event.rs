//! Timeline event - the single record type of the workflow log

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{is_zero, EventStatus, WorkflowStep};

/// Metadata flag set on events appended by a reversion
pub const REVERSION_FLAG: &str = "isReversion";

/// One step of a workflow session
///
/// Events are never deleted. Their status moves forward through
/// [`EventStatus::can_transition_to`] and the `undone` state is only ever
/// reached through a reversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub step: WorkflowStep,
    pub status: EventStatus,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds between start and end
    #[serde(default)]
    pub duration: i64,
    #[serde(rename = "datasetId", default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(
        rename = "transformationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transformation_id: Option<String>,
    #[serde(default = "empty_object")]
    pub details: Value,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    /// Store insertion sequence, used as the final ordering tiebreak
    #[serde(default, skip_serializing_if = "is_zero")]
    pub seq: u64,
}

pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl TimelineEvent {
    /// Create a new in-progress event with a fresh id
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        step: WorkflowStep,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            step,
            status: EventStatus::InProgress,
            start_time,
            end_time: None,
            duration: 0,
            dataset_id: None,
            transformation_id: None,
            details: empty_object(),
            metadata: empty_object(),
            seq: 0,
        }
    }

    pub fn with_dataset(mut self, dataset_id: Option<String>) -> Self {
        self.dataset_id = dataset_id;
        self
    }

    pub fn with_transformation(mut self, transformation_id: Option<String>) -> Self {
        self.transformation_id = transformation_id;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn title(&self) -> &'static str {
        self.step.title()
    }

    pub fn description(&self) -> &'static str {
        self.step.description()
    }

    /// Position of this event in its session's timeline
    pub fn order_key(&self) -> (u8, DateTime<Utc>, u64) {
        (self.step.ordinal(), self.start_time, self.seq)
    }

    /// Compare two events of the same session by `(step, startTime)`
    pub fn timeline_cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }

    /// Whether this event was appended to record a reversion
    pub fn is_reversion(&self) -> bool {
        self.metadata
            .get(REVERSION_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Close the event with `status` at `end_time`
    pub fn finish(&mut self, status: EventStatus, end_time: DateTime<Utc>) {
        self.status = status;
        self.duration = (end_time - self.start_time).num_milliseconds().max(0);
        self.end_time = Some(end_time);
    }

    /// Shallow-merge `patch` into the metadata object
    ///
    /// Keys in `patch` overwrite existing keys; other keys are kept. A
    /// non-object patch is ignored.
    pub fn merge_metadata(&mut self, patch: Value) {
        let Value::Object(patch) = patch else {
            return;
        };
        if !self.metadata.is_object() {
            self.metadata = empty_object();
        }
        if let Value::Object(existing) = &mut self.metadata {
            existing.extend(patch);
        }
    }
}

/// API representation with the derived step fields filled in
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: TimelineEvent,
    #[serde(rename = "stepKey")]
    pub step_key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl From<TimelineEvent> for EventView {
    fn from(event: TimelineEvent) -> Self {
        Self {
            step_key: event.step.key(),
            title: event.title(),
            description: event.description(),
            event,
        }
    }
}
