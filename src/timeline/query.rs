//! Timeline reads

use crate::error::{TimelineError, TimelineResult};
use crate::types::{EventStatus, TimelineEvent};

use super::TimelineService;

/// Get one event owned by `user_id`
pub fn get_event(
    svc: &TimelineService,
    user_id: &str,
    event_id: &str,
) -> TimelineResult<TimelineEvent> {
    let store = svc.store.read();
    let event = store.find(event_id)?;
    if event.user_id != user_id {
        return Err(TimelineError::Forbidden(format!(
            "event '{}' belongs to another user",
            event_id
        )));
    }
    Ok(event.clone())
}

/// Events of a session ordered by `(step, startTime)`
///
/// An unknown or empty session is `SessionNotFound`. With `include_undone`
/// false, reverted events are left out.
pub fn get_session_timeline(
    svc: &TimelineService,
    user_id: &str,
    session_id: &str,
    include_undone: bool,
) -> TimelineResult<Vec<TimelineEvent>> {
    let events = svc.store.read().session_events(session_id);

    if events.is_empty() {
        return Err(TimelineError::SessionNotFound(session_id.to_string()));
    }
    if events.iter().any(|e| e.user_id != user_id) {
        return Err(TimelineError::Forbidden(format!(
            "session '{}' belongs to another user",
            session_id
        )));
    }

    Ok(events
        .into_iter()
        .filter(|e| include_undone || e.status != EventStatus::Undone)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::EventStoreConfig;
    use crate::timeline::{LogStepInput, StepInput};
    use tempfile::TempDir;

    fn log(svc: &TimelineService, user: &str, session: &str, key: &str) -> TimelineEvent {
        svc.log_step(
            user,
            LogStepInput {
                step: StepInput {
                    session_id: session.to_string(),
                    step_key: key.to_string(),
                    ..Default::default()
                },
                duration: Some(10),
                status: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_timeline_is_ordered_by_step() {
        let temp_dir = TempDir::new().unwrap();
        let svc = TimelineService::open(EventStoreConfig::with_data_dir(temp_dir.path())).unwrap();

        let validate = log(&svc, "alice", "s-1", "DATA_VALIDATION");
        let ingest = log(&svc, "alice", "s-1", "DATA_INGESTION");

        let timeline = svc.get_session_timeline("alice", "s-1", true).unwrap();
        let ids: Vec<&str> = timeline.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![ingest.id.as_str(), validate.id.as_str()]);
    }

    #[test]
    fn test_unknown_session() {
        let temp_dir = TempDir::new().unwrap();
        let svc = TimelineService::open(EventStoreConfig::with_data_dir(temp_dir.path())).unwrap();

        assert!(matches!(
            svc.get_session_timeline("alice", "nope", true),
            Err(TimelineError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_ownership_checks() {
        let temp_dir = TempDir::new().unwrap();
        let svc = TimelineService::open(EventStoreConfig::with_data_dir(temp_dir.path())).unwrap();
        let event = log(&svc, "alice", "s-1", "DATA_INGESTION");

        assert!(matches!(
            svc.get_session_timeline("bob", "s-1", true),
            Err(TimelineError::Forbidden(_))
        ));
        assert!(matches!(
            svc.get_event("bob", &event.id),
            Err(TimelineError::Forbidden(_))
        ));
        assert_eq!(svc.get_event("alice", &event.id).unwrap(), event);
    }
}
