//! Error types for the runner

use herdindex_store::StoreError;
use thiserror::Error;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors that can occur while running a job
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Another run holds the job
    #[error("Job is already running: {0}")]
    AlreadyRunning(String),

    /// The computation could not be launched, failed, timed out or was cancelled
    #[error("External computation failed for job {job}: {reason}")]
    ExternalProcess {
        job: String,
        reason: String,
        exit_code: Option<i32>,
    },

    /// Reading or writing the job failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The run task panicked or was aborted
    #[error("Run task failed: {0}")]
    Task(String),
}

impl RunnerError {
    /// Generic message safe to show to users
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::AlreadyRunning(_) => "job is already running",
            Self::ExternalProcess { .. } => "job run failed",
            Self::Store(err) => err.public_message(),
            Self::Task(_) => "internal error",
        }
    }
}
