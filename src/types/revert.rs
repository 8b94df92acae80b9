//! Reversion outcome types

use serde::{Deserialize, Serialize};

use super::{EventView, TimelineEvent};

/// A linked transformation record that could not be marked undone
///
/// The reversion itself is committed; the warning tells the caller the
/// external mirror is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeWarning {
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "transformationId")]
    pub transformation_id: String,
    pub message: String,
}

/// Outcome of a successful reversion
#[derive(Debug, Clone)]
pub struct RevertResult {
    pub reverted_to_event: TimelineEvent,
    /// Events newly moved to `undone` by this call
    pub undone_count: usize,
    pub undone_event_ids: Vec<String>,
    pub reversion_event: TimelineEvent,
    pub cascade_warnings: Vec<CascadeWarning>,
}

impl RevertResult {
    /// Whether the revert committed but some cascades failed
    pub fn is_partial(&self) -> bool {
        !self.cascade_warnings.is_empty()
    }
}

/// JSON shape of [`RevertResult`]
#[derive(Debug, Clone, Serialize)]
pub struct RevertResponse {
    #[serde(rename = "revertedToEvent")]
    pub reverted_to_event: EventView,
    #[serde(rename = "undoneCount")]
    pub undone_count: usize,
    #[serde(rename = "undoneEventIds")]
    pub undone_event_ids: Vec<String>,
    #[serde(rename = "reversionEvent")]
    pub reversion_event: EventView,
    #[serde(rename = "cascadeWarnings")]
    pub cascade_warnings: Vec<CascadeWarning>,
}

impl From<RevertResult> for RevertResponse {
    fn from(result: RevertResult) -> Self {
        Self {
            reverted_to_event: result.reverted_to_event.into(),
            undone_count: result.undone_count,
            undone_event_ids: result.undone_event_ids,
            reversion_event: result.reversion_event.into(),
            cascade_warnings: result.cascade_warnings,
        }
    }
}
