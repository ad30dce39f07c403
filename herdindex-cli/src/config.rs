//! Configuration module
//!
//! Settings shared by every command.

use anyhow::{Result, bail};
use herdindex_runner::RunnerConfig;
use herdindex_store::StoreConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub runner: RunnerConfig,
    /// Owner of the jobs addressed by job commands
    pub user: Option<String>,
}

impl Config {
    /// User for commands that address jobs
    pub fn user(&self) -> Result<&str> {
        match self.user.as_deref() {
            Some(user) if !user.is_empty() => Ok(user),
            _ => bail!("no user given; pass --user or set HERDINDEX_USER"),
        }
    }
}
