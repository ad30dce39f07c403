//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use super::traits::TraitWeight;

/// A user's selection-index job
///
/// Status is derived when the job is read: it is never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// User namespace the job belongs to
    pub owner: String,
    pub name: String,
    pub status: JobStatus,
    pub comment: String,
    pub target_database: String,
    pub sale_endpoint: String,
    /// Computed trait weights; empty unless the job passed
    pub output: Vec<TraitWeight>,
    /// Most recent run, when the job has been run by this system
    pub last_run: Option<RunRecord>,
}

impl Job {
    /// Keys of every weighted trait in the output
    pub fn output_keys(&self) -> HashSet<String> {
        self.output.iter().map(TraitWeight::key).collect()
    }

    pub fn is_processing(&self) -> bool {
        self.status == JobStatus::Processing
    }
}

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Passed,
    Failed,
    Processing,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Passed => f.write_str("Passed"),
            JobStatus::Failed => f.write_str("Failed"),
            JobStatus::Processing => f.write_str("Processing"),
        }
    }
}

/// Persisted record of the latest run of a job
///
/// Replaced as a whole on every transition, so readers see either the
/// previous record or the new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub state: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
}

impl RunRecord {
    /// Record for a run that is about to launch
    pub fn started() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: JobStatus::Processing,
            started_at: Utc::now(),
            finished_at: None,
            exit_code: None,
            message: None,
        }
    }

    /// Closes the record with a final state
    pub fn finish(self, state: JobStatus, exit_code: Option<i32>, message: Option<String>) -> Self {
        Self {
            state,
            finished_at: Some(Utc::now()),
            exit_code,
            message,
            ..self
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state != JobStatus::Processing
    }
}

/// Document written by the external computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    #[serde(rename = "indexElement")]
    pub elements: Vec<TraitWeight>,
    #[serde(default)]
    pub status: OutputStatus,
}

/// Outcome encoded in an output file; absent means passed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    #[default]
    Passed,
    Failed,
}

impl From<OutputStatus> for JobStatus {
    fn from(status: OutputStatus) -> Self {
        match status {
            OutputStatus::Passed => JobStatus::Passed,
            OutputStatus::Failed => JobStatus::Failed,
        }
    }
}
