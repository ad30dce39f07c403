//! Runner configuration
//!
//! Defines how the external computation is launched and how long a run may
//! take before it is killed.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

/// Default deadline of a run: six hours
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// External computation binary, looked up in PATH when relative
    pub program: PathBuf,

    /// Arguments placed before the job file arguments
    pub program_args: Vec<String>,

    /// Maximum time a run can take before it is killed
    pub job_timeout: Duration,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            program_args: Vec::new(),
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Optional environment variables:
    /// - HERDINDEX_PROGRAM (default: starter)
    /// - HERDINDEX_PROGRAM_ARGS (whitespace separated, default: none)
    /// - HERDINDEX_JOB_TIMEOUT (seconds, default: 21600)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(program) = std::env::var_os("HERDINDEX_PROGRAM") {
            config.program = PathBuf::from(program);
        }

        if let Ok(args) = std::env::var("HERDINDEX_PROGRAM_ARGS") {
            config.program_args = args.split_whitespace().map(str::to_string).collect();
        }

        if let Ok(timeout) = std::env::var("HERDINDEX_JOB_TIMEOUT") {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid HERDINDEX_JOB_TIMEOUT '{timeout}'"))?;
            config.job_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Adds an argument placed before the job file arguments
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.program_args.push(arg.into());
        self
    }

    pub fn with_timeout(mut self, job_timeout: Duration) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.program.as_os_str().is_empty() {
            anyhow::bail!("program cannot be empty");
        }

        if self.job_timeout.is_zero() {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new("starter")
    }
}
