//! Utility functions and helpers
//!
//! Atomic file writes and time sources.

pub mod atomic;
pub mod time;

pub use atomic::{
    atomic_replace, atomic_write, remove_staging_files, staging_path, AtomicError, AtomicResult,
};
pub use time::{current_timestamp_millis, Clock, ManualClock, SystemClock};
