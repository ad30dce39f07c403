//! Herdindex CLI
//!
//! Command-line interface over the job store, the breed databases and the
//! job runner.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use colored::*;
use commands::{Commands, handle_command, is_client_error, public_message};
use config::Config;
use herdindex_runner::RunnerConfig;
use herdindex_store::StoreConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "herdindex")]
#[command(about = "Selection index jobs and breed database comparisons", long_about = None)]
struct Cli {
    /// Root of the per-user job directories
    #[arg(long, global = true)]
    users_root: Option<PathBuf>,

    /// Root of the breed database directories
    #[arg(long, global = true)]
    databases_root: Option<PathBuf>,

    /// User owning the jobs
    #[arg(long, global = true, env = "HERDINDEX_USER")]
    user: Option<String>,

    /// External computation program
    #[arg(long, global = true)]
    program: Option<PathBuf>,

    /// Argument placed before the job file arguments; repeat for several
    #[arg(long = "program-arg", global = true, allow_hyphen_values = true)]
    program_args: Vec<String>,

    /// Deadline of one run, in seconds
    #[arg(long, global = true)]
    job_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Settings from the environment, overridden by the flags given
    fn config(&self) -> Result<Config> {
        let mut store = StoreConfig::from_env();
        if let Some(root) = &self.users_root {
            store.users_root = root.clone();
        }
        if let Some(root) = &self.databases_root {
            store.databases_root = root.clone();
        }
        store.validate()?;

        let mut runner = RunnerConfig::from_env()?;
        if let Some(program) = &self.program {
            runner.program = program.clone();
        }
        for arg in &self.program_args {
            runner = runner.with_arg(arg.clone());
        }
        if let Some(secs) = self.job_timeout {
            runner.job_timeout = Duration::from_secs(secs);
        }
        runner.validate()?;

        Ok(Config {
            store,
            runner,
            user: self.user.clone(),
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herdindex=info,herdindex_store=info,herdindex_runner=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.config() {
        Ok(config) => handle_command(cli.command, &config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if is_client_error(&e) {
            warn!("{:#}", e);
        } else {
            error!("{:#}", e);
        }
        eprintln!("{} {}", "Error:".red().bold(), public_message(&e));
        std::process::exit(1);
    }
}
