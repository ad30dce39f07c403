//! Herdindex Runner
//!
//! Runs the external selection-index computation for a job.
//!
//! A run holds the job's lock for its whole length, records its progress in
//! the job's run record, and is bounded by a deadline. Runs can be awaited
//! directly or spawned as tasks that callers poll, subscribe to or cancel.

pub mod config;
pub mod error;
pub mod execution;
pub mod scheduler;
pub mod service;

pub use config::RunnerConfig;
pub use error::{Result, RunnerError};
pub use scheduler::{JobRunner, RunHandle, RunState};
