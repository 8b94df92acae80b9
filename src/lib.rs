//! Workflow Timeline Server
//!
//! Records every step of a multi-stage data-preparation workflow as a
//! timeline event, lets a user roll a session back to any completed step,
//! and aggregates per-user statistics over the recorded history.
//!
//! # Modules
//!
//! - `types`: Core data structures (TimelineEvent, WorkflowStep, EventStatus)
//! - `event_store`: Append-only JSONL log with snapshots and replay
//! - `timeline`: Step recorder, reversion engine and statistics aggregator
//! - `api`: Axum REST API with JWT authentication
//! - `config`: Environment-driven server configuration
//! - `utils`: Atomic file writes and clocks
//!
//! # Example
//!
//! ```no_run
//! use workflow_timeline::event_store::EventStoreConfig;
//! use workflow_timeline::timeline::{StepInput, TimelineService};
//!
//! let service = TimelineService::open(EventStoreConfig::new("data")).unwrap();
//! let session_id = service.create_session("alice");
//! let event = service
//!     .start_step(
//!         "alice",
//!         StepInput {
//!             session_id,
//!             step_key: "DATA_INGESTION".to_string(),
//!             ..Default::default()
//!         },
//!     )
//!     .unwrap();
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod event_store;
pub mod timeline;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::ServerConfig;
pub use error::{TimelineError, TimelineResult};
pub use timeline::TimelineService;
pub use types::{EventStatus, TimelineEvent, WorkflowStep};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
