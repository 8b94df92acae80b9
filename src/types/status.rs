//! Event status and its transition table

use serde::{Deserialize, Serialize};

/// Lifecycle status of a timeline event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Undone,
}

impl EventStatus {
    pub const ALL: [EventStatus; 5] = [
        EventStatus::Pending,
        EventStatus::InProgress,
        EventStatus::Completed,
        EventStatus::Failed,
        EventStatus::Undone,
    ];

    /// Persisted name, e.g. `in_progress`
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
            EventStatus::Undone => "undone",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EventStatus::Completed | EventStatus::Failed | EventStatus::Undone
        )
    }

    /// Whether a step recorder may finish an event with this status
    pub fn is_completion(self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Failed)
    }

    /// Allowed transitions:
    ///
    /// ```text
    /// pending ──► in_progress ──► completed ──► undone
    ///    │             │      └──► failed
    ///    ├──► completed/failed
    ///    └──► undone   (in_progress ──► undone as well)
    /// ```
    ///
    /// `failed` and `undone` never move again; `completed` only leaves
    /// through a reversion.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        match (self, next) {
            (Pending, InProgress) => true,
            (Pending | InProgress, Completed | Failed) => true,
            (Pending | InProgress | Completed, Undone) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
