//! Execution service
//!
//! Launches the external computation as a child process:
//!
//! ```text
//! <program> [program_args...] -genParm <master> -indexParm <eco> -outputFile <output>
//! ```
//!
//! The child is killed when the deadline passes or the run is cancelled.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::execution::{ExecutionResult, Invocation};

/// Longest stderr excerpt kept in a failure message
const STDERR_EXCERPT: usize = 2000;

/// Service trait for executing the computation
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Executes the computation for one job
    ///
    /// # Arguments
    /// * `invocation` - Input and output files of the job
    /// * `deadline` - Maximum time the execution may take
    /// * `cancel` - Token that aborts the execution when cancelled
    ///
    /// # Returns
    /// How the execution ended; launch failures are reported as `Failure`
    async fn execute(
        &self,
        invocation: &Invocation,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> ExecutionResult;
}

/// Runs the computation as a local child process
pub struct ProcessExecutionService {
    program: PathBuf,
    program_args: Vec<String>,
}

impl ProcessExecutionService {
    pub fn new(program: impl Into<PathBuf>, program_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            program_args,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.program.clone(), config.program_args.clone())
    }

    fn process_output(
        job: &str,
        result: std::io::Result<std::process::Output>,
    ) -> ExecutionResult {
        match result {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();

                if !stdout.is_empty() {
                    debug!("Job {} stdout: {}", job, stdout.trim_end());
                }
                if !stderr.is_empty() {
                    debug!("Job {} stderr: {}", job, stderr.trim_end());
                }

                if output.status.success() {
                    info!("Computation for job {} exited successfully", job);
                    return ExecutionResult::Success { stdout, stderr };
                }

                let exit_code = output.status.code();
                let error = match stderr.trim() {
                    "" => format!("computation exited with {}", output.status),
                    text => excerpt(text).to_string(),
                };
                warn!("Computation for job {} failed: {}", job, output.status);

                ExecutionResult::Failure { exit_code, error }
            }
            Err(e) => {
                error!("Failed waiting on computation for job {}: {}", job, e);
                ExecutionResult::Failure {
                    exit_code: None,
                    error: format!("failed waiting on computation: {e}"),
                }
            }
        }
    }
}

#[async_trait]
impl ExecutionService for ProcessExecutionService {
    async fn execute(
        &self,
        invocation: &Invocation,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        info!(
            "Starting {} for job {}",
            self.program.display(),
            invocation.job
        );

        let child = Command::new(&self.program)
            .args(&self.program_args)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                error!(
                    "Failed to launch {} for job {}: {}",
                    self.program.display(),
                    invocation.job,
                    e
                );
                return ExecutionResult::Failure {
                    exit_code: None,
                    error: format!("failed to launch {}: {}", self.program.display(), e),
                };
            }
        };

        // Dropping the wait future drops the child, which kills it.
        tokio::select! {
            result = child.wait_with_output() => Self::process_output(&invocation.job, result),
            _ = tokio::time::sleep(deadline) => {
                warn!(
                    "Computation for job {} exceeded {}s, killing it",
                    invocation.job,
                    deadline.as_secs()
                );
                ExecutionResult::Timeout { after: deadline }
            }
            _ = cancel.cancelled() => {
                info!("Computation for job {} cancelled", invocation.job);
                ExecutionResult::Cancelled
            }
        }
    }
}

/// Tail of `text` at most `STDERR_EXCERPT` bytes long, cut on a char boundary
fn excerpt(text: &str) -> &str {
    if text.len() <= STDERR_EXCERPT {
        return text;
    }
    let mut start = text.len() - STDERR_EXCERPT;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
