//! Execution types for the runner
//!
//! These types only exist while a run is in progress. What survives a run is
//! the run record built from the result.

use herdindex_core::domain::job::{JobStatus, RunRecord};
use herdindex_store::repository::job::JobPaths;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Exit code recorded for runs killed at their deadline
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Files handed to the external computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// `user/job`, for logs
    pub job: String,
    pub master_params: PathBuf,
    pub eco_params: PathBuf,
    pub output: PathBuf,
}

impl Invocation {
    pub fn for_job(paths: &JobPaths) -> Self {
        Self {
            job: paths.label(),
            master_params: paths.master_params.clone(),
            eco_params: paths.eco_params.clone(),
            output: paths.output.clone(),
        }
    }

    /// Named file arguments of the computation
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-genParm".into(),
            self.master_params.clone().into_os_string(),
            "-indexParm".into(),
            self.eco_params.clone().into_os_string(),
            "-outputFile".into(),
            self.output.clone().into_os_string(),
        ]
    }
}

/// Result of one execution of the computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success {
        stdout: String,
        stderr: String,
    },
    Failure {
        exit_code: Option<i32>,
        error: String,
    },
    Timeout {
        after: Duration,
    },
    Cancelled,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionResult::Success { .. } => Some(0),
            ExecutionResult::Failure { exit_code, .. } => *exit_code,
            ExecutionResult::Timeout { .. } => Some(TIMEOUT_EXIT_CODE),
            ExecutionResult::Cancelled => None,
        }
    }

    /// Why the execution did not succeed
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Failure { error, .. } => Some(error.clone()),
            ExecutionResult::Timeout { after } => {
                Some(format!("timed out after {}s", after.as_secs()))
            }
            ExecutionResult::Cancelled => Some("cancelled".to_string()),
        }
    }

    /// Closes a run record with this result
    pub fn to_run_record(&self, record: RunRecord) -> RunRecord {
        let state = if self.is_success() {
            JobStatus::Passed
        } else {
            JobStatus::Failed
        };
        record.finish(state, self.exit_code(), self.failure_reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdindex_store::StoreConfig;

    #[test]
    fn test_execution_result_success() {
        let result = ExecutionResult::Success {
            stdout: "done".into(),
            stderr: String::new(),
        };

        let record = result.to_run_record(RunRecord::started());
        assert_eq!(record.state, JobStatus::Passed);
        assert_eq!(record.exit_code, Some(0));
        assert_eq!(record.message, None);
    }

    #[test]
    fn test_execution_result_failure() {
        let result = ExecutionResult::Failure {
            exit_code: Some(2),
            error: "missing herd file".into(),
        };

        let record = result.to_run_record(RunRecord::started());
        assert_eq!(record.state, JobStatus::Failed);
        assert_eq!(record.exit_code, Some(2));
        assert_eq!(record.message.as_deref(), Some("missing herd file"));
    }

    #[test]
    fn test_execution_result_timeout() {
        let result = ExecutionResult::Timeout {
            after: Duration::from_secs(90),
        };

        let record = result.to_run_record(RunRecord::started());
        assert_eq!(record.state, JobStatus::Failed);
        assert_eq!(record.exit_code, Some(TIMEOUT_EXIT_CODE));
        assert_eq!(record.message.as_deref(), Some("timed out after 90s"));
        assert!(!result.is_success());
    }

    #[test]
    fn test_execution_result_cancelled() {
        let record = ExecutionResult::Cancelled.to_run_record(RunRecord::started());
        assert_eq!(record.state, JobStatus::Failed);
        assert_eq!(record.exit_code, None);
    }

    #[test]
    fn test_invocation_args() {
        let config = StoreConfig::new("/data", "/epds");
        let paths = JobPaths::resolve(&config, "alice", "spring").unwrap();
        let invocation = Invocation::for_job(&paths);

        let args: Vec<String> = invocation
            .args()
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            vec![
                "-genParm",
                "/data/users/alice/jobs/spring/masterParams.json",
                "-indexParm",
                "/data/users/alice/jobs/spring/ecoParams.json",
                "-outputFile",
                "/data/users/alice/jobs/spring/output.json",
            ]
        );
        assert_eq!(invocation.job, "alice/spring");
    }
}
