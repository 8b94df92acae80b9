//! Reversion engine
//!
//! Reverting to an event marks every later event of the session `undone`
//! and appends a reversion marker. The flip and the marker go to the store
//! as one record; linked transformation records are updated afterwards and
//! their failures only produce warnings.

use serde_json::json;

use crate::error::{TimelineError, TimelineResult};
use crate::types::{
    CascadeWarning, EventStatus, RevertResult, TimelineEvent, WorkflowStep, REVERSION_FLAG,
};

use super::TimelineService;

/// Roll the session back to `event_id`
pub fn revert_to_event(
    svc: &TimelineService,
    user_id: &str,
    session_id: &str,
    event_id: &str,
) -> TimelineResult<RevertResult> {
    {
        let store = svc.store.read();
        let target = store.find(event_id)?;
        if target.user_id != user_id || target.session_id != session_id {
            return Err(TimelineError::Forbidden(format!(
                "event '{}' is not part of session '{}' for this user",
                event_id, session_id
            )));
        }
    }

    let lock = svc.locks.lock_for(session_id);
    let _guard = lock.lock();

    let (target, later) = {
        let store = svc.store.read();
        let target = store.find(event_id)?.clone();
        if target.status != EventStatus::Completed {
            return Err(TimelineError::InvalidRevertTarget {
                event_id: event_id.to_string(),
                status: target.status,
            });
        }
        let later = later_set(store.session_events(session_id), &target);
        (target, later)
    };

    let to_undo: Vec<&TimelineEvent> = later
        .iter()
        .filter(|e| e.status.can_transition_to(EventStatus::Undone))
        .collect();
    let candidate_ids: Vec<String> = to_undo.iter().map(|e| e.id.clone()).collect();

    let marker = reversion_marker(svc, &target, &candidate_ids);
    let commit = svc
        .store
        .write()
        .commit_reversion(&target.id, &candidate_ids, marker)?;

    tracing::info!(
        session = session_id,
        target = event_id,
        undone = commit.undone_event_ids.len(),
        "timeline reverted"
    );

    let cascade_warnings = cascade_undo(svc, &to_undo, &commit.undone_event_ids);

    Ok(RevertResult {
        reverted_to_event: target,
        undone_count: commit.undone_event_ids.len(),
        undone_event_ids: commit.undone_event_ids,
        reversion_event: commit.reversion_event,
        cascade_warnings,
    })
}

/// Events strictly after `target` in timeline order, without reversion markers
///
/// `events` must already be in timeline order.
pub(crate) fn later_set(events: Vec<TimelineEvent>, target: &TimelineEvent) -> Vec<TimelineEvent> {
    let split = events
        .iter()
        .position(|e| e.id == target.id)
        .map(|pos| pos + 1)
        .unwrap_or_else(|| events.partition_point(|e| e.timeline_cmp(target).is_le()));

    events
        .into_iter()
        .skip(split)
        .filter(|e| !e.is_reversion())
        .collect()
}

fn reversion_marker(
    svc: &TimelineService,
    target: &TimelineEvent,
    undone_ids: &[String],
) -> TimelineEvent {
    let now = svc.clock.now();
    let mut marker = TimelineEvent::new(
        target.user_id.clone(),
        target.session_id.clone(),
        WorkflowStep::DataTransformation,
        now,
    )
    .with_dataset(target.dataset_id.clone())
    .with_details(json!({
        "revertedToEventId": target.id,
        "revertedToStep": target.step.ordinal(),
        "revertedToTitle": target.title(),
        "undoneCount": undone_ids.len(),
        "undoneEventIds": undone_ids,
    }))
    .with_metadata(json!({
        REVERSION_FLAG: true,
        "targetEventId": target.id,
    }));
    marker.finish(EventStatus::Completed, now);
    marker
}

/// Mirror `undone` onto linked transformation records
fn cascade_undo(
    svc: &TimelineService,
    candidates: &[&TimelineEvent],
    undone_ids: &[String],
) -> Vec<CascadeWarning> {
    let mut warnings = Vec::new();

    for event in candidates.iter().filter(|e| undone_ids.contains(&e.id)) {
        let Some(transformation_id) = &event.transformation_id else {
            continue;
        };

        if let Err(e) = svc
            .transformations
            .set_status(transformation_id, EventStatus::Undone)
        {
            tracing::warn!(
                event_id = %event.id,
                transformation_id = %transformation_id,
                error = %e,
                "failed to mark transformation undone"
            );
            warnings.push(CascadeWarning {
                event_id: event.id.clone(),
                transformation_id: transformation_id.clone(),
                message: e.to_string(),
            });
        }
    }

    warnings
}
