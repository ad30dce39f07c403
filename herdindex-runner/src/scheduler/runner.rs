//! Job runner
//!
//! A run goes through these steps, in order:
//! 1. take the job's run lock (the sentinel); a held lock fails the run
//! 2. remove any output left by an earlier run
//! 3. write a `processing` run record
//! 4. execute the computation under the configured deadline
//! 5. write the final run record
//! 6. release the lock
//!
//! The lock is released on every return path once taken, so a failed run
//! leaves the job retryable. A run dropped before step 5 records itself as
//! failed before releasing the lock.

use herdindex_core::domain::job::{JobStatus, RunRecord};
use herdindex_store::StoreConfig;
use herdindex_store::StoreError;
use herdindex_store::repository::job::{JobPaths, OutputFile, RunLock};
use herdindex_store::repository::job_repository;
use herdindex_store::service::job_service;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use crate::execution::{ExecutionResult, Invocation};
use crate::service::{ExecutionService, ProcessExecutionService};

/// Message recorded when the computation exits cleanly without usable output
pub const OUTPUT_UNUSABLE: &str = "output file missing or unreadable";

/// Message recorded when the output file itself reports a failure
pub const OUTPUT_REPORTED_FAILURE: &str = "computation reported failure";

/// Message recorded when a run is dropped before the computation finished
pub const RUN_ABANDONED: &str = "run abandoned before completion";

/// Progress of a spawned run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Waiting to take the job's lock
    Pending,
    Running { run_id: Uuid },
    Finished { run_id: Uuid, status: JobStatus },
    /// The run ended before the computation could start
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished { .. } | RunState::Aborted)
    }
}

/// Runs jobs of one store with one execution service
#[derive(Clone)]
pub struct JobRunner {
    store: StoreConfig,
    config: RunnerConfig,
    executor: Arc<dyn ExecutionService>,
}

impl JobRunner {
    pub fn new(store: StoreConfig, config: RunnerConfig, executor: Arc<dyn ExecutionService>) -> Self {
        Self {
            store,
            config,
            executor,
        }
    }

    /// Runner launching the configured program as a child process
    pub fn with_process(store: StoreConfig, config: RunnerConfig) -> Self {
        let executor = Arc::new(ProcessExecutionService::from_config(&config));
        Self::new(store, config, executor)
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Runs a job and waits for the computation to finish
    ///
    /// # Returns
    /// The execution result when the job passed. A failed, timed out or
    /// cancelled computation is an `ExternalProcess` error.
    pub async fn run(&self, user: &str, name: &str) -> Result<ExecutionResult> {
        let (state, _) = watch::channel(RunState::Pending);
        self.execute_run(user, name, CancellationToken::new(), &state)
            .await
    }

    /// Starts a run on the runtime and returns a handle to it
    pub fn spawn(&self, user: &str, name: &str) -> RunHandle {
        let (state_tx, state_rx) = watch::channel(RunState::Pending);
        let cancel = CancellationToken::new();
        let job = format!("{user}/{name}");

        let runner = self.clone();
        let user = user.to_string();
        let name = name.to_string();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let result = runner.execute_run(&user, &name, token, &state_tx).await;
            if result.is_err() {
                state_tx.send_if_modified(|state| {
                    if state.is_terminal() {
                        return false;
                    }
                    *state = RunState::Aborted;
                    true
                });
            }
            result
        });

        RunHandle {
            job,
            cancel,
            state: state_rx,
            task,
        }
    }

    /// Marks runs interrupted by a previous process as failed
    ///
    /// Only call this while no run is active on the store.
    pub fn reconcile(&self) -> Result<Vec<(String, String)>> {
        Ok(job_service::reconcile_stale_runs(&self.store)?)
    }

    async fn execute_run(
        &self,
        user: &str,
        name: &str,
        cancel: CancellationToken,
        state: &watch::Sender<RunState>,
    ) -> Result<ExecutionResult> {
        let paths = JobPaths::resolve(&self.store, user, name)?;
        let label = paths.label();

        if job_repository::read_params(&paths)?.is_none() {
            return Err(StoreError::JobNotFound(label).into());
        }

        let lock = job_repository::acquire_run_lock(&paths).map_err(|e| match e {
            StoreError::JobBusy(job) => RunnerError::AlreadyRunning(job),
            other => other.into(),
        })?;

        job_repository::remove_output(&paths)?;
        let record = RunRecord::started();
        let run_id = record.run_id;
        job_repository::write_status(&paths, &record)?;
        let active = ActiveRun {
            paths: paths.clone(),
            record: Some(record),
            _lock: lock,
        };
        state.send_replace(RunState::Running { run_id });

        info!("Job {} run {} started", label, run_id);

        let invocation = Invocation::for_job(&paths);
        let result = self
            .executor
            .execute(&invocation, self.config.job_timeout, cancel)
            .await;

        let record = active.finish(|record| close_record(&paths, &result, record))?;

        state.send_replace(RunState::Finished {
            run_id,
            status: record.state,
        });

        match record.state {
            JobStatus::Passed => {
                info!("Job {} run {} passed", label, run_id);
                Ok(result)
            }
            _ => {
                let reason = record.message.unwrap_or_else(|| "failed".to_string());
                warn!("Job {} run {} failed: {}", label, run_id, reason);
                Err(RunnerError::ExternalProcess {
                    job: label,
                    reason,
                    exit_code: record.exit_code,
                })
            }
        }
    }
}

/// A started run holding the job's lock
///
/// Dropped without `finish`, it closes its record as failed, then releases the
/// lock. Fields drop after `Drop::drop`, so the record is written first.
struct ActiveRun {
    paths: JobPaths,
    record: Option<RunRecord>,
    _lock: RunLock,
}

impl ActiveRun {
    /// Writes the final record and releases the lock
    fn finish(mut self, close: impl FnOnce(RunRecord) -> RunRecord) -> Result<RunRecord> {
        let Some(record) = self.record.take() else {
            return Err(RunnerError::Task("run record already closed".into()));
        };
        let run_id = record.run_id;
        let record = close(record);

        if let Err(e) = job_repository::write_status(&self.paths, &record) {
            error!(
                "Failed to record the end of run {} of job {}: {}",
                run_id,
                self.paths.label(),
                e
            );
            self.record = Some(record);
            return Err(e.into());
        }

        Ok(record)
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        let Some(record) = self.record.take() else {
            return;
        };
        let record = if record.is_finished() {
            record
        } else {
            record.finish(JobStatus::Failed, None, Some(RUN_ABANDONED.to_string()))
        };

        warn!("Run {} of job {} ended early", record.run_id, self.paths.label());
        if let Err(e) = job_repository::write_status(&self.paths, &record) {
            error!(
                "Failed to record the end of run {} of job {}: {}",
                record.run_id,
                self.paths.label(),
                e
            );
        }
    }
}

/// Final run record for an execution result
///
/// A clean exit only passes when the output file parses and does not report
/// a failure itself.
fn close_record(paths: &JobPaths, result: &ExecutionResult, record: RunRecord) -> RunRecord {
    if !result.is_success() {
        return result.to_run_record(record);
    }

    let message = match job_repository::read_output(paths) {
        Ok(OutputFile::Parsed(output)) if JobStatus::from(output.status) == JobStatus::Passed => {
            return result.to_run_record(record);
        }
        Ok(OutputFile::Parsed(_)) => OUTPUT_REPORTED_FAILURE,
        Ok(OutputFile::Missing | OutputFile::Unreadable(_)) => OUTPUT_UNUSABLE,
        Err(e) => {
            error!("Failed to read output of job {}: {}", paths.label(), e);
            OUTPUT_UNUSABLE
        }
    };

    record.finish(JobStatus::Failed, result.exit_code(), Some(message.to_string()))
}

/// Handle to a spawned run
pub struct RunHandle {
    job: String,
    cancel: CancellationToken,
    state: watch::Receiver<RunState>,
    task: JoinHandle<Result<ExecutionResult>>,
}

impl RunHandle {
    /// `user/job` of the run
    pub fn job(&self) -> &str {
        &self.job
    }

    /// Current progress, without waiting
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// Waits for the next progress change and returns the new state
    ///
    /// Returns the current state at once when the run has already ended.
    pub async fn changed(&mut self) -> RunState {
        let _ = self.state.changed().await;
        self.state.borrow_and_update().clone()
    }

    /// Asks the run to stop; the computation is killed
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to end
    pub async fn wait(self) -> Result<ExecutionResult> {
        self.task
            .await
            .map_err(|e| RunnerError::Task(e.to_string()))?
    }
}
