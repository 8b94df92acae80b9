//! Summary types for session listings and timeline statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the session listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "eventCount")]
    pub event_count: usize,
    #[serde(rename = "datasetName", skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    /// Percentage of events in `completed` state
    #[serde(rename = "completionRate")]
    pub completion_rate: f64,
    /// Sum of event durations in milliseconds
    #[serde(rename = "totalDuration")]
    pub total_duration: i64,
}

/// Duration statistics for one step, over events with a positive duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDurationStats {
    pub step: u8,
    #[serde(rename = "stepKey")]
    pub step_key: String,
    pub count: usize,
    #[serde(rename = "avgDuration")]
    pub avg_duration: f64,
    #[serde(rename = "minDuration")]
    pub min_duration: i64,
    #[serde(rename = "maxDuration")]
    pub max_duration: i64,
}

/// Completion ratio for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSuccessRate {
    pub step: u8,
    #[serde(rename = "stepKey")]
    pub step_key: String,
    #[serde(rename = "totalCount")]
    pub total_count: usize,
    #[serde(rename = "completedCount")]
    pub completed_count: usize,
    /// Always within `[0, 100]`
    #[serde(rename = "successRate")]
    pub success_rate: f64,
}

/// Dashboard statistics for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Statistics {
    #[serde(rename = "totalSessions")]
    pub total_sessions: usize,
    /// Mean session span in milliseconds
    #[serde(rename = "averageSessionDuration")]
    pub average_session_duration: f64,
    #[serde(rename = "stepDurations")]
    pub step_durations: Vec<StepDurationStats>,
    #[serde(rename = "stepSuccessRates")]
    pub step_success_rates: Vec<StepSuccessRate>,
}

/// `part / whole * 100`, or zero when `whole` is zero
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}
