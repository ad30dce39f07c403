//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod database;
mod job;

pub use database::DatabaseCommands;
pub use job::JobCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use herdindex_runner::{JobRunner, RunnerError};
use herdindex_store::StoreError;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Breed databases and comparisons
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },
    /// Mark runs interrupted by a crash as failed
    Reconcile,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Database { command } => database::handle_database_command(command, config),
        Commands::Reconcile => reconcile(config),
    }
}

fn reconcile(config: &Config) -> Result<()> {
    let runner = JobRunner::with_process(config.store.clone(), config.runner.clone());
    let jobs = runner.reconcile()?;

    if jobs.is_empty() {
        println!("{}", "No interrupted runs found.".green());
    } else {
        println!(
            "{}",
            format!("Marked {} interrupted run(s) as failed:", jobs.len()).bold()
        );
        for (user, name) in jobs {
            println!("  {} {}/{}", "▸".cyan(), user, name.yellow());
        }
    }

    Ok(())
}

/// True if the user can fix the failure by changing the command
pub fn is_client_error(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<RunnerError>() {
        return match e {
            RunnerError::AlreadyRunning(_) => true,
            RunnerError::Store(e) => e.is_client_error(),
            _ => false,
        };
    }
    err.downcast_ref::<StoreError>()
        .is_none_or(StoreError::is_client_error)
}

/// Message shown to the user for a failed command
///
/// Store and runner errors are reduced to their generic message. Errors raised
/// by the CLI itself are shown as they are.
pub fn public_message(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<RunnerError>() {
        return e.public_message().to_string();
    }
    if let Some(e) = err.downcast_ref::<StoreError>() {
        return e.public_message().to_string();
    }
    err.to_string()
}
