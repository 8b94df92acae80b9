//! Materialized timeline state
//!
//! The in-memory view derived from the record log: events by id, each
//! session's events in timeline order, and each user's sessions.

use std::collections::{BTreeSet, HashMap};

use crate::types::{
    EventCompletedData, EventRecordedData, EventStatus, EventsRevertedData, LogRecord, RecordType,
    TimelineEvent, WorkflowStep,
};

use super::store::EventStoreResult;

#[derive(Debug, Default, Clone)]
pub struct TimelineState {
    events: HashMap<String, TimelineEvent>,
    /// Event ids per session, sorted by `(step, startTime, seq)`
    sessions: HashMap<String, Vec<String>>,
    user_sessions: HashMap<String, BTreeSet<String>>,
}

impl TimelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build state from snapshot events
    pub fn from_events(events: Vec<TimelineEvent>) -> Self {
        let mut state = Self::new();
        for event in events {
            state.insert(event);
        }
        state
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, event_id: &str) -> Option<&TimelineEvent> {
        self.events.get(event_id)
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.events.contains_key(event_id)
    }

    /// All events, in no particular order
    pub fn events(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.values()
    }

    /// Events of one session in timeline order
    pub fn session_events(&self, session_id: &str) -> Vec<&TimelineEvent> {
        self.sessions
            .get(session_id)
            .map(|ids| ids.iter().filter_map(|id| self.events.get(id)).collect())
            .unwrap_or_default()
    }

    /// Distinct sessions owned by `user_id`
    pub fn user_sessions(&self, user_id: &str) -> Vec<&str> {
        self.user_sessions
            .get(user_id)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Events owned by `user_id`, optionally narrowed to one step and status
    pub fn query(
        &self,
        user_id: &str,
        step: Option<WorkflowStep>,
        status: Option<EventStatus>,
    ) -> Vec<&TimelineEvent> {
        self.user_sessions(user_id)
            .into_iter()
            .flat_map(|session_id| self.session_events(session_id))
            .filter(|e| e.user_id == user_id)
            .filter(|e| step.map_or(true, |s| e.step == s))
            .filter(|e| status.map_or(true, |s| e.status == s))
            .collect()
    }

    /// Count events per status
    pub fn status_counts(&self) -> HashMap<EventStatus, usize> {
        let mut counts = HashMap::new();
        for event in self.events.values() {
            *counts.entry(event.status).or_insert(0) += 1;
        }
        counts
    }

    /// Insert a new event; an id that is already present is left untouched
    pub fn insert(&mut self, event: TimelineEvent) -> bool {
        if self.events.contains_key(&event.id) {
            return false;
        }

        self.user_sessions
            .entry(event.user_id.clone())
            .or_default()
            .insert(event.session_id.clone());

        let key = event.order_key();
        let ids = self.sessions.entry(event.session_id.clone()).or_default();
        let events = &self.events;
        let pos = ids.partition_point(|id| {
            events
                .get(id)
                .map(|existing| existing.order_key() <= key)
                .unwrap_or(true)
        });
        ids.insert(pos, event.id.clone());

        self.events.insert(event.id.clone(), event);
        true
    }

    /// Apply a single record to the state
    ///
    /// Application is idempotent and conditional: a record that would move an
    /// event along a transition [`EventStatus::can_transition_to`] forbids is
    /// skipped, as is a record naming an unknown event.
    pub fn apply(&mut self, record: &LogRecord) -> EventStoreResult<()> {
        match record.record_type {
            RecordType::EventRecorded => {
                let data: EventRecordedData = record.parse_data()?;
                let mut event = data.event;
                if event.seq == 0 {
                    event.seq = record.seq;
                }
                self.insert(event);
            }

            RecordType::EventCompleted => {
                let data: EventCompletedData = record.parse_data()?;

                let Some(event) = self.events.get_mut(&data.event_id) else {
                    tracing::warn!(event_id = %data.event_id, seq = record.seq, "completion for unknown event skipped");
                    return Ok(());
                };
                if !event.status.can_transition_to(data.status) {
                    tracing::warn!(
                        event_id = %data.event_id,
                        from = %event.status,
                        to = %data.status,
                        "completion skipped by status guard"
                    );
                    return Ok(());
                }

                event.status = data.status;
                event.end_time = Some(data.end_time);
                event.duration = data.duration;
                event.details = data.details;
                event.metadata = data.metadata;
            }

            RecordType::EventsReverted => {
                let data: EventsRevertedData = record.parse_data()?;

                for event_id in &data.undone_event_ids {
                    if let Some(event) = self.events.get_mut(event_id) {
                        if event.status.can_transition_to(EventStatus::Undone) {
                            event.status = EventStatus::Undone;
                        }
                    }
                }

                let mut reversion = data.reversion_event;
                if reversion.seq == 0 {
                    reversion.seq = record.seq;
                }
                self.insert(reversion);
            }
        }

        Ok(())
    }
}
