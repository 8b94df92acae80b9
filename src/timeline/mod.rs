//! Timeline service - step recording, reversion and statistics
//!
//! [`TimelineService`] is the single entry point used by the HTTP layer. It
//! owns the event store and the per-session lock table; the operations
//! themselves live in the submodules and are re-exposed here.

mod collaborators;
mod locks;
mod query;
mod recorder;
mod revert;
mod statistics;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::TimelineResult;
use crate::event_store::{EventStore, EventStoreConfig, EventStoreStats};
use crate::types::{
    RevertResult, SessionSummary, Statistics, StepDurationStats, StepSuccessRate, TimelineEvent,
};
use crate::utils::{Clock, SystemClock};

pub use collaborators::{CollaboratorError, DatasetCatalog, InMemoryRecords, TransformationRecords};
pub use locks::SessionLocks;
pub use recorder::{CompleteInput, LogStepInput, StepInput};
pub use statistics::MAX_SESSION_PAGE;

/// Workflow timeline engine
pub struct TimelineService {
    pub(crate) store: RwLock<EventStore>,
    pub(crate) locks: SessionLocks,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) transformations: Arc<dyn TransformationRecords>,
    pub(crate) datasets: Arc<dyn DatasetCatalog>,
}

impl TimelineService {
    /// Wrap an open store, with the wall clock and empty in-memory collaborators
    pub fn new(store: EventStore) -> Self {
        let records = Arc::new(InMemoryRecords::new());
        Self {
            store: RwLock::new(store),
            locks: SessionLocks::new(),
            clock: Arc::new(SystemClock),
            transformations: records.clone(),
            datasets: records,
        }
    }

    /// Open the store under `config` and wrap it
    pub fn open(config: EventStoreConfig) -> TimelineResult<Self> {
        Ok(Self::new(EventStore::open(config)?))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transformations(mut self, transformations: Arc<dyn TransformationRecords>) -> Self {
        self.transformations = transformations;
        self
    }

    pub fn with_datasets(mut self, datasets: Arc<dyn DatasetCatalog>) -> Self {
        self.datasets = datasets;
        self
    }

    /// Storage figures of the underlying event store
    pub fn store_stats(&self) -> TimelineResult<EventStoreStats> {
        Ok(EventStoreStats::collect(&self.store.read())?)
    }

    /// Force a snapshot of the current state
    pub fn snapshot(&self) -> TimelineResult<()> {
        Ok(self.store.write().snapshot()?)
    }
}

// Step recorder (from recorder.rs)
impl TimelineService {
    pub fn create_session(&self, user_id: &str) -> String {
        recorder::create_session(self, user_id)
    }

    pub fn start_step(&self, user_id: &str, input: StepInput) -> TimelineResult<TimelineEvent> {
        recorder::start_step(self, user_id, input)
    }

    pub fn complete_step(
        &self,
        user_id: &str,
        event_id: &str,
        input: CompleteInput,
    ) -> TimelineResult<TimelineEvent> {
        recorder::complete_step(self, user_id, event_id, input)
    }

    pub fn log_step(&self, user_id: &str, input: LogStepInput) -> TimelineResult<TimelineEvent> {
        recorder::log_step(self, user_id, input)
    }
}

// Timeline reads (from query.rs)
impl TimelineService {
    pub fn get_event(&self, user_id: &str, event_id: &str) -> TimelineResult<TimelineEvent> {
        query::get_event(self, user_id, event_id)
    }

    pub fn get_session_timeline(
        &self,
        user_id: &str,
        session_id: &str,
        include_undone: bool,
    ) -> TimelineResult<Vec<TimelineEvent>> {
        query::get_session_timeline(self, user_id, session_id, include_undone)
    }
}

// Reversion engine (from revert.rs)
impl TimelineService {
    pub fn revert_to_event(
        &self,
        user_id: &str,
        session_id: &str,
        event_id: &str,
    ) -> TimelineResult<RevertResult> {
        revert::revert_to_event(self, user_id, session_id, event_id)
    }
}

// Statistics aggregator (from statistics.rs)
impl TimelineService {
    pub fn session_count(&self, user_id: &str) -> usize {
        statistics::session_count(self, user_id)
    }

    pub fn step_durations(&self, user_id: &str) -> Vec<StepDurationStats> {
        statistics::step_durations(self, user_id)
    }

    pub fn step_success_rates(&self, user_id: &str) -> Vec<StepSuccessRate> {
        statistics::step_success_rates(self, user_id)
    }

    pub fn average_session_duration(&self, user_id: &str) -> f64 {
        statistics::average_session_duration(self, user_id)
    }

    pub fn list_sessions(&self, user_id: &str, limit: usize, offset: usize) -> Vec<SessionSummary> {
        statistics::list_sessions(self, user_id, limit, offset)
    }

    pub fn statistics(&self, user_id: &str) -> Statistics {
        statistics::statistics(self, user_id)
    }
}
