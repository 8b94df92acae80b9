//! Timeline Integration Tests
//!
//! End-to-end behaviour of the timeline service over a real data directory:
//! - Step recording and timeline ordering
//! - Reverting a session and idempotent re-reverts
//! - Statistics and session listings
//! - State recovery from log replay and snapshots
//! - Storage failures during a revert
//! - Recorder writes racing a revert of the same session

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use workflow_timeline::event_store::EventStoreConfig;
use workflow_timeline::timeline::{
    CompleteInput, InMemoryRecords, LogStepInput, StepInput, TimelineService,
};
use workflow_timeline::types::REVERSION_FLAG;
use workflow_timeline::utils::ManualClock;
use workflow_timeline::{EventStatus, TimelineError, TimelineEvent, WorkflowStep};

const USER: &str = "alice";

struct Fixture {
    service: TimelineService,
    clock: Arc<ManualClock>,
    records: Arc<InMemoryRecords>,
    temp_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        Self::open(temp_dir, default_config)
    }

    fn open(temp_dir: TempDir, config: impl Fn(&Path) -> EventStoreConfig) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ));
        let records = Arc::new(InMemoryRecords::new());
        let service = TimelineService::open(config(temp_dir.path()))
            .unwrap()
            .with_clock(clock.clone())
            .with_transformations(records.clone())
            .with_datasets(records.clone());

        Self {
            service,
            clock,
            records,
            temp_dir,
        }
    }

    /// Reopen the same data directory with a fresh service
    fn reopen(self) -> Self {
        let Fixture { service, temp_dir, .. } = self;
        drop(service);
        Self::open(temp_dir, default_config)
    }

    fn input(&self, session: &str, key: &str) -> StepInput {
        StepInput {
            session_id: session.to_string(),
            step_key: key.to_string(),
            ..Default::default()
        }
    }

    /// Start a step, let a second pass, and complete it
    fn run_step(&self, session: &str, key: &str) -> TimelineEvent {
        self.run_with(self.input(session, key), EventStatus::Completed)
    }

    fn run_with(&self, input: StepInput, status: EventStatus) -> TimelineEvent {
        let started = self.service.start_step(USER, input).unwrap();
        self.clock.advance(Duration::seconds(1));
        self.service
            .complete_step(
                USER,
                &started.id,
                CompleteInput {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .unwrap()
    }
}

fn default_config(dir: &Path) -> EventStoreConfig {
    EventStoreConfig::with_data_dir(dir)
}

fn status_of(service: &TimelineService, event_id: &str) -> EventStatus {
    service.get_event(USER, event_id).unwrap().status
}

#[test]
fn test_revert_undoes_later_steps() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);

    let ingest = fx.run_step(&session, "DATA_INGESTION");
    let nlp = fx.run_step(&session, "NLP_PROCESSING");
    let transform = fx.run_step(&session, "DATA_TRANSFORMATION");
    let validate = fx.run_step(&session, "DATA_VALIDATION");

    let result = fx.service.revert_to_event(USER, &session, &nlp.id).unwrap();

    assert_eq!(result.undone_count, 2);
    assert_eq!(result.reverted_to_event.id, nlp.id);
    assert!(result.cascade_warnings.is_empty());
    let mut undone = result.undone_event_ids.clone();
    undone.sort();
    let mut expected = vec![transform.id.clone(), validate.id.clone()];
    expected.sort();
    assert_eq!(undone, expected);

    assert_eq!(status_of(&fx.service, &ingest.id), EventStatus::Completed);
    assert_eq!(status_of(&fx.service, &nlp.id), EventStatus::Completed);
    assert_eq!(status_of(&fx.service, &transform.id), EventStatus::Undone);
    assert_eq!(status_of(&fx.service, &validate.id), EventStatus::Undone);

    let marker = &result.reversion_event;
    assert_eq!(marker.step, WorkflowStep::DataTransformation);
    assert_eq!(marker.status, EventStatus::Completed);
    assert_eq!(marker.duration, 0);
    assert!(marker.is_reversion());
    assert_eq!(marker.metadata[REVERSION_FLAG], json!(true));
    assert_eq!(marker.metadata["targetEventId"], json!(nlp.id));
    assert_eq!(marker.details["revertedToEventId"], json!(nlp.id));
    assert_eq!(marker.details["revertedToStep"], json!(2));
    assert_eq!(marker.details["revertedToTitle"], json!(nlp.title()));
    assert_eq!(marker.details["undoneCount"], json!(2));

    let timeline = fx.service.get_session_timeline(USER, &session, true).unwrap();
    assert_eq!(timeline.len(), 5);
    let active = fx.service.get_session_timeline(USER, &session, false).unwrap();
    assert_eq!(active.len(), 3);
    assert!(active.iter().any(|e| e.id == marker.id));
}

#[test]
fn test_second_revert_flips_nothing_new() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);

    fx.run_step(&session, "DATA_INGESTION");
    let nlp = fx.run_step(&session, "NLP_PROCESSING");
    fx.run_step(&session, "DATA_TRANSFORMATION");
    fx.run_step(&session, "DATA_VALIDATION");

    let first = fx.service.revert_to_event(USER, &session, &nlp.id).unwrap();
    let second = fx.service.revert_to_event(USER, &session, &nlp.id).unwrap();

    assert_eq!(first.undone_count, 2);
    assert_eq!(second.undone_count, 0);
    assert!(second.undone_event_ids.is_empty());
    assert_ne!(first.reversion_event.id, second.reversion_event.id);

    // Both markers survive; neither undid the other
    assert_eq!(status_of(&fx.service, &first.reversion_event.id), EventStatus::Completed);
    assert_eq!(
        fx.service.get_session_timeline(USER, &session, true).unwrap().len(),
        6
    );
}

#[test]
fn test_revert_to_non_completed_event_changes_nothing() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);

    let ingest = fx.run_step(&session, "DATA_INGESTION");
    let running = fx
        .service
        .start_step(USER, fx.input(&session, "NLP_PROCESSING"))
        .unwrap();
    let before = fx.service.get_session_timeline(USER, &session, true).unwrap();

    let err = fx
        .service
        .revert_to_event(USER, &session, &running.id)
        .unwrap_err();
    assert!(matches!(
        err,
        TimelineError::InvalidRevertTarget { status: EventStatus::InProgress, .. }
    ));

    let after = fx.service.get_session_timeline(USER, &session, true).unwrap();
    assert_eq!(before, after);
    assert_eq!(status_of(&fx.service, &ingest.id), EventStatus::Completed);
}

#[test]
fn test_revert_checks_ownership_and_existence() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);
    let ingest = fx.run_step(&session, "DATA_INGESTION");

    assert!(matches!(
        fx.service.revert_to_event(USER, &session, "missing"),
        Err(TimelineError::EventNotFound(_))
    ));
    assert!(matches!(
        fx.service.revert_to_event("bob", &session, &ingest.id),
        Err(TimelineError::Forbidden(_))
    ));
    assert!(matches!(
        fx.service.revert_to_event(USER, "other-session", &ingest.id),
        Err(TimelineError::Forbidden(_))
    ));
}

#[test]
fn test_revert_leaves_failed_events_alone() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);

    let ingest = fx.run_step(&session, "DATA_INGESTION");
    let failed = fx.run_with(fx.input(&session, "NLP_PROCESSING"), EventStatus::Failed);
    let running = fx
        .service
        .start_step(USER, fx.input(&session, "DATA_VALIDATION"))
        .unwrap();

    let result = fx.service.revert_to_event(USER, &session, &ingest.id).unwrap();

    assert_eq!(result.undone_event_ids, vec![running.id.clone()]);
    assert_eq!(status_of(&fx.service, &failed.id), EventStatus::Failed);
    assert_eq!(status_of(&fx.service, &running.id), EventStatus::Undone);

    // An undone event can no longer be completed
    let err = fx
        .service
        .complete_step(USER, &running.id, CompleteInput::default())
        .unwrap_err();
    assert!(matches!(err, TimelineError::InvalidTransition { .. }));
}

#[test]
fn test_revert_uses_step_order_not_time() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);

    let ingest = fx.run_step(&session, "DATA_INGESTION");
    let nlp = fx.run_step(&session, "NLP_PROCESSING");
    // Ingestion retried after NLP already ran
    let retry = fx.run_step(&session, "DATA_INGESTION");

    let timeline = fx.service.get_session_timeline(USER, &session, true).unwrap();
    let ids: Vec<&str> = timeline.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![ingest.id.as_str(), retry.id.as_str(), nlp.id.as_str()]);

    let result = fx.service.revert_to_event(USER, &session, &retry.id).unwrap();
    assert_eq!(result.undone_event_ids, vec![nlp.id.clone()]);
    assert_eq!(status_of(&fx.service, &ingest.id), EventStatus::Completed);
}

#[test]
fn test_cascade_failures_become_warnings() {
    let fx = Fixture::new();
    fx.records.add_transformation("t-known", EventStatus::Completed);
    let session = fx.service.create_session(USER);

    let ingest = fx.run_step(&session, "DATA_INGESTION");
    let mut known = fx.input(&session, "DATA_TRANSFORMATION");
    known.transformation_id = Some("t-known".to_string());
    fx.run_with(known, EventStatus::Completed);
    let mut unknown = fx.input(&session, "DATA_VALIDATION");
    unknown.transformation_id = Some("t-gone".to_string());
    let orphan = fx.run_with(unknown, EventStatus::Completed);

    let result = fx.service.revert_to_event(USER, &session, &ingest.id).unwrap();

    assert_eq!(result.undone_count, 2);
    assert!(result.is_partial());
    assert_eq!(result.cascade_warnings.len(), 1);
    assert_eq!(result.cascade_warnings[0].event_id, orphan.id);
    assert_eq!(result.cascade_warnings[0].transformation_id, "t-gone");
    assert_eq!(
        fx.records.transformation_status("t-known"),
        Some(EventStatus::Undone)
    );
    // The timeline change itself is committed
    assert_eq!(status_of(&fx.service, &orphan.id), EventStatus::Undone);
}

#[test]
fn test_complete_unknown_event_stores_nothing() {
    let fx = Fixture::new();

    let err = fx
        .service
        .complete_step(USER, "does-not-exist", CompleteInput::default())
        .unwrap_err();

    assert!(matches!(err, TimelineError::EventNotFound(_)));
    assert_eq!(fx.service.store_stats().unwrap().event_count, 0);
    assert_eq!(fx.service.store_stats().unwrap().log_size, 0);
}

#[test]
fn test_completion_rate_and_listing() {
    let fx = Fixture::new();
    fx.records.add_dataset("ds-7", "Customer churn");

    let older = fx.service.create_session(USER);
    fx.run_step(&older, "DATA_INGESTION");

    fx.clock.advance(Duration::hours(1));
    let newer = fx.service.create_session(USER);
    let mut first = fx.input(&newer, "DATA_INGESTION");
    first.dataset_id = Some("ds-7".to_string());
    fx.run_with(first, EventStatus::Completed);
    fx.run_step(&newer, "NLP_PROCESSING");
    fx.run_step(&newer, "DATA_TRANSFORMATION");
    fx.run_with(fx.input(&newer, "DATA_VALIDATION"), EventStatus::Failed);

    let sessions = fx.service.list_sessions(USER, 10, 0);
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, newer);
    assert_eq!(sessions[0].event_count, 4);
    assert_eq!(sessions[0].completion_rate, 75.0);
    assert_eq!(sessions[0].total_duration, 4000);
    assert_eq!(sessions[0].dataset_name.as_deref(), Some("Customer churn"));
    assert_eq!(sessions[1].session_id, older);
    assert_eq!(sessions[1].completion_rate, 100.0);
    assert!(sessions[1].dataset_name.is_none());

    let page = fx.service.list_sessions(USER, 1, 1);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].session_id, older);

    assert!(fx.service.list_sessions("bob", 10, 0).is_empty());
}

#[test]
fn test_statistics() {
    let fx = Fixture::new();
    let a = fx.service.create_session(USER);
    fx.run_step(&a, "DATA_INGESTION");
    fx.run_with(fx.input(&a, "NLP_PROCESSING"), EventStatus::Failed);

    let b = fx.service.create_session(USER);
    fx.run_step(&b, "DATA_INGESTION");
    fx.service
        .log_step(
            USER,
            LogStepInput {
                step: fx.input(&b, "NLP_PROCESSING"),
                duration: Some(3000),
                status: None,
            },
        )
        .unwrap();

    // A session with nothing finished does not count towards the average
    let c = fx.service.create_session(USER);
    fx.service.start_step(USER, fx.input(&c, "DATA_INGESTION")).unwrap();

    let stats = fx.service.statistics(USER);
    assert_eq!(stats.total_sessions, 3);
    assert_eq!(stats.step_durations.len(), 8);
    assert_eq!(stats.step_success_rates.len(), 8);

    let ingest = &stats.step_durations[0];
    assert_eq!(ingest.step_key, "DATA_INGESTION");
    assert_eq!(ingest.count, 2);
    assert_eq!(ingest.avg_duration, 1000.0);

    let nlp = &stats.step_durations[1];
    assert_eq!(nlp.count, 2);
    assert_eq!(nlp.min_duration, 1000);
    assert_eq!(nlp.max_duration, 3000);
    assert_eq!(nlp.avg_duration, 2000.0);

    let ingest_rate = &stats.step_success_rates[0];
    assert_eq!(ingest_rate.total_count, 3);
    assert_eq!(ingest_rate.completed_count, 2);
    assert_eq!(stats.step_success_rates[1].success_rate, 50.0);
    assert_eq!(stats.step_success_rates[7].success_rate, 0.0);
    assert!(stats
        .step_success_rates
        .iter()
        .all(|r| (0.0..=100.0).contains(&r.success_rate)));

    assert!(stats.average_session_duration > 0.0);

    let empty = fx.service.statistics("nobody");
    assert_eq!(empty.total_sessions, 0);
    assert_eq!(empty.average_session_duration, 0.0);
    assert!(empty.step_success_rates.iter().all(|r| r.success_rate == 0.0));
}

#[test]
fn test_state_survives_reopen() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);
    fx.run_step(&session, "DATA_INGESTION");
    let nlp = fx.run_step(&session, "NLP_PROCESSING");
    let transform = fx.run_step(&session, "DATA_TRANSFORMATION");
    let result = fx.service.revert_to_event(USER, &session, &nlp.id).unwrap();
    let before = fx.service.get_session_timeline(USER, &session, true).unwrap();

    let fx = fx.reopen();

    let after = fx.service.get_session_timeline(USER, &session, true).unwrap();
    assert_eq!(before, after);
    assert_eq!(status_of(&fx.service, &transform.id), EventStatus::Undone);
    assert!(fx
        .service
        .get_event(USER, &result.reversion_event.id)
        .unwrap()
        .is_reversion());
}

#[test]
fn test_state_survives_reopen_from_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let small = |dir: &Path| {
        EventStoreConfig::with_data_dir(dir).with_snapshot_threshold(3)
    };
    let fx = Fixture::open(temp_dir, small);
    let session = fx.service.create_session(USER);
    fx.run_step(&session, "DATA_INGESTION");
    let nlp = fx.run_step(&session, "NLP_PROCESSING");
    fx.run_step(&session, "DATA_TRANSFORMATION");
    fx.service.revert_to_event(USER, &session, &nlp.id).unwrap();
    let before = fx.service.get_session_timeline(USER, &session, true).unwrap();

    let stats = fx.service.store_stats().unwrap();
    assert!(stats.snapshot_size > 0);
    assert!(stats.last_snapshot_seq > 0);

    let Fixture { service, temp_dir, .. } = fx;
    drop(service);
    let fx = Fixture::open(temp_dir, small);

    assert_eq!(
        fx.service.get_session_timeline(USER, &session, true).unwrap(),
        before
    );
}

#[test]
fn test_failed_revert_write_leaves_state_untouched() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);
    fx.run_step(&session, "DATA_INGESTION");
    let nlp = fx.run_step(&session, "NLP_PROCESSING");
    let transform = fx.run_step(&session, "DATA_TRANSFORMATION");
    let before = fx.service.get_session_timeline(USER, &session, true).unwrap();

    // Make the log unwritable by putting a directory in its place
    let log_path = fx.temp_dir.path().join("events.jsonl");
    let saved = std::fs::read(&log_path).unwrap();
    std::fs::remove_file(&log_path).unwrap();
    std::fs::create_dir(&log_path).unwrap();

    let err = fx
        .service
        .revert_to_event(USER, &session, &nlp.id)
        .unwrap_err();
    assert!(matches!(err, TimelineError::Storage(_)));
    assert_eq!(err.code(), "STORAGE_FAILURE");

    let after = fx.service.get_session_timeline(USER, &session, true).unwrap();
    assert_eq!(before, after);
    assert_eq!(status_of(&fx.service, &transform.id), EventStatus::Completed);

    // Nothing of the failed revert reached disk either
    std::fs::remove_dir(&log_path).unwrap();
    std::fs::write(&log_path, saved).unwrap();
    let fx = fx.reopen();
    assert_eq!(
        fx.service.get_session_timeline(USER, &session, true).unwrap(),
        before
    );
}

#[test]
fn test_concurrent_reverts_of_different_sessions() {
    let fx = Fixture::new();
    let service = Arc::new(fx.service);

    let targets: Vec<(String, String)> = (0..4)
        .map(|_| {
            let session = service.create_session(USER);
            let mut target = None;
            for key in ["DATA_INGESTION", "NLP_PROCESSING", "DATA_TRANSFORMATION"] {
                let started = service
                    .start_step(
                        USER,
                        StepInput {
                            session_id: session.clone(),
                            step_key: key.to_string(),
                            ..Default::default()
                        },
                    )
                    .unwrap();
                let done = service
                    .complete_step(USER, &started.id, CompleteInput::default())
                    .unwrap();
                target.get_or_insert(done.id);
            }
            (session, target.unwrap())
        })
        .collect();

    let handles: Vec<_> = targets
        .into_iter()
        .map(|(session, target)| {
            let service = service.clone();
            std::thread::spawn(move || service.revert_to_event(USER, &session, &target).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().undone_count, 2);
    }
    assert_eq!(service.store_stats().unwrap().event_count, 4 * 3 + 4);
}

#[test]
fn test_revert_races_recorder_writes_in_same_session() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);
    let target = fx.run_step(&session, "DATA_INGESTION");
    fx.run_step(&session, "NLP_PROCESSING");
    let service = Arc::new(fx.service);

    let writer = {
        let service = service.clone();
        let session = session.clone();
        std::thread::spawn(move || {
            for _ in 0..40 {
                let started = service
                    .start_step(
                        USER,
                        StepInput {
                            session_id: session.clone(),
                            step_key: "DATA_VALIDATION".to_string(),
                            ..Default::default()
                        },
                    )
                    .unwrap();
                // Loses to the revert when it was undone in between
                let _ = service.complete_step(USER, &started.id, CompleteInput::default());
            }
        })
    };

    while service.get_session_timeline(USER, &session, true).unwrap().len() < 6 {
        std::thread::yield_now();
    }
    let result = service.revert_to_event(USER, &session, &target.id).unwrap();
    writer.join().unwrap();

    // Everything recorded before the marker was in the later set and is
    // undone; everything recorded after it is untouched
    let marker_seq = result.reversion_event.seq;
    let timeline = service.get_session_timeline(USER, &session, true).unwrap();
    assert_eq!(timeline.len(), 2 + 40 + 1);

    let mut recorded_before = 0;
    for event in timeline
        .iter()
        .filter(|e| e.id != target.id && !e.is_reversion())
    {
        if event.seq < marker_seq {
            recorded_before += 1;
            assert_eq!(event.status, EventStatus::Undone, "event {}", event.id);
            assert!(result.undone_event_ids.contains(&event.id));
        } else {
            assert_ne!(event.status, EventStatus::Undone, "event {}", event.id);
        }
    }
    assert_eq!(result.undone_count, recorded_before);
    assert_eq!(status_of(&service, &target.id), EventStatus::Completed);
}

#[test]
fn test_step_logged_after_torn_tail_survives_restart() {
    let fx = Fixture::new();
    let session = fx.service.create_session(USER);
    fx.run_step(&session, "DATA_INGESTION");
    let log_path = fx.temp_dir.path().join("events.jsonl");

    // Crash residue: half a record without its newline
    let mut log = std::fs::read(&log_path).unwrap();
    log.extend_from_slice(br#"{"recordType":"event_reco"#);
    std::fs::write(&log_path, log).unwrap();

    let fx = fx.reopen();
    let acked = fx
        .service
        .log_step(
            USER,
            LogStepInput {
                step: fx.input(&session, "NLP_PROCESSING"),
                duration: Some(500),
                status: None,
            },
        )
        .unwrap();

    let fx = fx.reopen();
    assert_eq!(fx.service.get_event(USER, &acked.id).unwrap(), acked);
    assert_eq!(
        fx.service.get_session_timeline(USER, &session, true).unwrap().len(),
        2
    );
}
