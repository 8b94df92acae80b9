//! Statistics aggregator
//!
//! Read-only, per-user rollups. These take only the store read lock, never
//! a session lock, so a concurrent revert may or may not be reflected.

use crate::types::{
    percentage, EventStatus, SessionSummary, Statistics, StepDurationStats, StepSuccessRate,
    TimelineEvent, WorkflowStep,
};

use super::TimelineService;

/// Upper bound on the page size of [`list_sessions`]
pub const MAX_SESSION_PAGE: usize = 1000;

/// Number of distinct sessions of a user
pub fn session_count(svc: &TimelineService, user_id: &str) -> usize {
    svc.store.read().user_sessions(user_id).len()
}

/// Duration figures per step, over events with a positive duration
pub fn step_durations(svc: &TimelineService, user_id: &str) -> Vec<StepDurationStats> {
    let store = svc.store.read();

    WorkflowStep::ALL
        .iter()
        .map(|&step| {
            let durations: Vec<i64> = store
                .query(user_id, Some(step), None)
                .into_iter()
                .map(|e| e.duration)
                .filter(|&d| d > 0)
                .collect();

            let count = durations.len();
            let avg_duration = if count == 0 {
                0.0
            } else {
                durations.iter().sum::<i64>() as f64 / count as f64
            };

            StepDurationStats {
                step: step.ordinal(),
                step_key: step.key().to_string(),
                count,
                avg_duration,
                min_duration: durations.iter().copied().min().unwrap_or(0),
                max_duration: durations.iter().copied().max().unwrap_or(0),
            }
        })
        .collect()
}

/// Share of completed events per step, in percent
pub fn step_success_rates(svc: &TimelineService, user_id: &str) -> Vec<StepSuccessRate> {
    let store = svc.store.read();

    WorkflowStep::ALL
        .iter()
        .map(|&step| {
            let events = store.query(user_id, Some(step), None);
            let total_count = events.len();
            let completed_count = events
                .iter()
                .filter(|e| e.status == EventStatus::Completed)
                .count();

            StepSuccessRate {
                step: step.ordinal(),
                step_key: step.key().to_string(),
                total_count,
                completed_count,
                success_rate: percentage(completed_count, total_count),
            }
        })
        .collect()
}

/// Mean span (last end - first start) of the user's finished sessions, in ms
pub fn average_session_duration(svc: &TimelineService, user_id: &str) -> f64 {
    let store = svc.store.read();

    let spans: Vec<i64> = store
        .user_sessions(user_id)
        .iter()
        .filter_map(|session_id| session_span(&store.session_events(session_id)))
        .collect();

    if spans.is_empty() {
        return 0.0;
    }
    spans.iter().sum::<i64>() as f64 / spans.len() as f64
}

/// Page of session summaries, most recent first
pub fn list_sessions(
    svc: &TimelineService,
    user_id: &str,
    limit: usize,
    offset: usize,
) -> Vec<SessionSummary> {
    let mut rows: Vec<(SessionSummary, Option<String>)> = {
        let store = svc.store.read();
        store
            .user_sessions(user_id)
            .iter()
            .filter_map(|session_id| summarize(session_id, &store.session_events(session_id)))
            .collect()
    };

    rows.sort_by(|a, b| {
        b.0.start_time
            .cmp(&a.0.start_time)
            .then_with(|| a.0.session_id.cmp(&b.0.session_id))
    });

    rows.into_iter()
        .skip(offset)
        .take(limit.min(MAX_SESSION_PAGE))
        .map(|(mut summary, dataset_id)| {
            summary.dataset_name = dataset_id.and_then(|id| resolve_dataset_name(svc, &id));
            summary
        })
        .collect()
}

/// Everything the dashboard shows for one user
pub fn statistics(svc: &TimelineService, user_id: &str) -> Statistics {
    Statistics {
        total_sessions: session_count(svc, user_id),
        average_session_duration: average_session_duration(svc, user_id),
        step_durations: step_durations(svc, user_id),
        step_success_rates: step_success_rates(svc, user_id),
    }
}

/// Milliseconds from first start to last end, if anything has ended
fn session_span(events: &[TimelineEvent]) -> Option<i64> {
    let start = events.iter().map(|e| e.start_time).min()?;
    let end = events.iter().filter_map(|e| e.end_time).max()?;
    Some((end - start).num_milliseconds().max(0))
}

/// Summary row plus the dataset id still to be resolved
fn summarize(
    session_id: &str,
    events: &[TimelineEvent],
) -> Option<(SessionSummary, Option<String>)> {
    let start_time = events.iter().map(|e| e.start_time).min()?;
    let completed = events
        .iter()
        .filter(|e| e.status == EventStatus::Completed)
        .count();
    let dataset_id = events.iter().find_map(|e| e.dataset_id.clone());

    let summary = SessionSummary {
        session_id: session_id.to_string(),
        start_time,
        end_time: events.iter().filter_map(|e| e.end_time).max(),
        event_count: events.len(),
        dataset_name: None,
        completion_rate: percentage(completed, events.len()),
        total_duration: events.iter().map(|e| e.duration).sum(),
    };

    Some((summary, dataset_id))
}

fn resolve_dataset_name(svc: &TimelineService, dataset_id: &str) -> Option<String> {
    match svc.datasets.dataset_name(dataset_id) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(dataset_id, error = %e, "dataset name lookup failed");
            None
        }
    }
}
