//! Job command handlers
//!
//! Handles all job-related CLI commands: listing, viewing details and
//! parameters, creating, running and deleting jobs.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use herdindex_core::domain::job::{Job, JobStatus, RunRecord};
use herdindex_core::domain::params::Endpoint;
use herdindex_core::domain::traits::trait_info;
use herdindex_core::dto::job::JobSummary;
use herdindex_runner::{JobRunner, RunState};
use herdindex_store::service::database::BreedDatabase;
use herdindex_store::service::{database_service, job_service};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List the user's jobs
    List,
    /// Get job details
    Get {
        /// Job name
        name: String,
    },
    /// Print the parameter documents of a job
    Params {
        /// Job name
        name: String,
    },
    /// Create a job, or replace the parameters of an existing one
    Create {
        /// Job name
        name: String,

        /// Genetic parameters file (JSON or Hjson)
        #[arg(long)]
        master: PathBuf,

        /// Economic parameters file (JSON or Hjson)
        #[arg(long)]
        eco: PathBuf,

        /// Point the job at this breed database
        #[arg(long)]
        target_database: Option<String>,
    },
    /// Run a job and wait for it to finish
    Run {
        /// Job name
        name: String,
    },
    /// Delete a job and its results
    Delete {
        /// Job name
        name: String,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let user = config.user()?;

    match command {
        JobCommands::List => list_jobs(config, user),
        JobCommands::Get { name } => get_job(config, user, &name),
        JobCommands::Params { name } => get_job_params(config, user, &name),
        JobCommands::Create {
            name,
            master,
            eco,
            target_database,
        } => create_job(config, user, &name, &master, &eco, target_database.as_deref()),
        JobCommands::Run { name } => run_job(config, user, &name).await,
        JobCommands::Delete { name } => delete_job(config, user, &name),
    }
}

/// List all jobs of the user
fn list_jobs(config: &Config, user: &str) -> Result<()> {
    let jobs = job_service::get_all_jobs(&config.store, user)?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(&JobSummary::from(job));
        }
    }

    Ok(())
}

/// Get and display a single job
fn get_job(config: &Config, user: &str, name: &str) -> Result<()> {
    let job = job_service::get_job(&config.store, user, name)?;
    print_job_details(&job);
    Ok(())
}

fn get_job_params(config: &Config, user: &str, name: &str) -> Result<()> {
    let (master, eco) = job_service::get_job_params(&config.store, user, name)?;

    println!("{}", "Master parameters:".bold());
    println!("{}", serde_json::to_string_pretty(&master)?);
    println!();
    println!("{}", "Economic parameters:".bold());
    println!("{}", serde_json::to_string_pretty(&eco)?);

    Ok(())
}

fn create_job(
    config: &Config,
    user: &str,
    name: &str,
    master: &Path,
    eco: &Path,
    target_database: Option<&str>,
) -> Result<()> {
    let master_text = std::fs::read_to_string(master)
        .with_context(|| format!("Failed to read {}", master.display()))?;
    let eco_text = std::fs::read_to_string(eco)
        .with_context(|| format!("Failed to read {}", eco.display()))?;

    let mut req = job_service::parse_create_request(name, &master_text, &eco_text)?;

    if req.eco.endpoint().is_none() {
        eprintln!(
            "{} unknown sale endpoint '{}'",
            "warning:".yellow().bold(),
            req.eco.sale_endpoint
        );
    }

    if let Some(database) = target_database {
        let db = BreedDatabase::open(&config.store, database)?;
        let requested = req.eco.index_components.clone();
        database_service::apply_target_database(&db, &mut req.master, &mut req.eco);

        for key in requested.iter().filter(|k| !req.eco.has_component(k)) {
            eprintln!(
                "{} index component {} is not in database {}; dropped",
                "warning:".yellow().bold(),
                key,
                db.name()
            );
        }
    }

    let replaced = job_service::job_exists(&config.store, user, name)?;
    let job = job_service::create_job(&config.store, user, req)?;

    let verb = if replaced { "replaced" } else { "created" };
    println!("{}", format!("✓ Job '{}' {}", job.name, verb).green());
    println!();
    print_job_details(&job);

    Ok(())
}

/// Run a job in the foreground
///
/// Ctrl-C cancels the run; the computation is killed and the run recorded as
/// failed.
async fn run_job(config: &Config, user: &str, name: &str) -> Result<()> {
    let runner = JobRunner::with_process(config.store.clone(), config.runner.clone());
    let mut handle = runner.spawn(user, name);

    loop {
        let state = tokio::select! {
            state = handle.changed() => state,
            _ = tokio::signal::ctrl_c() => {
                info!("Cancelling run of job {}", handle.job());
                handle.cancel();
                break;
            }
        };

        if let RunState::Running { run_id } = state {
            println!(
                "{} Job {} running (run {})",
                "▸".cyan(),
                handle.job(),
                run_id.to_string().dimmed()
            );
        }
        if state.is_terminal() {
            break;
        }
    }

    handle.wait().await?;

    let job = job_service::get_job(&config.store, user, name)?;
    println!("{}", format!("✓ Job '{}' passed", job.name).green());
    println!();
    print_job_details(&job);

    Ok(())
}

fn delete_job(config: &Config, user: &str, name: &str) -> Result<()> {
    job_service::delete_job(&config.store, user, name)?;
    println!("{}", format!("✓ Job '{}' deleted", name).green());
    Ok(())
}

/// Print a job summary line block
fn print_job_summary(job: &JobSummary) {
    println!("  {} {}", "▸".cyan(), job.name.bold());
    println!("    Status:   {}", colorize_status(&job.status));
    if !job.comment.is_empty() {
        println!("    Comment:  {}", job.comment.dimmed());
    }
    if !job.target_database.is_empty() {
        println!("    Database: {}", job.target_database);
    }
    if job.weights > 0 {
        println!("    Weights:  {}", job.weights);
    }
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  Name:          {}", job.name.cyan());
    println!("  Owner:         {}", job.owner.dimmed());
    println!("  Status:        {}", colorize_status(&job.status));
    println!("  Comment:       {}", job.comment);
    println!("  Database:      {}", job.target_database);
    println!(
        "  Sale endpoint: {}",
        Endpoint::parse(&job.sale_endpoint)
            .map(|e| e.display())
            .unwrap_or(job.sale_endpoint.as_str())
    );

    if let Some(record) = &job.last_run {
        print_run_record(record);
    }

    if !job.output.is_empty() {
        println!("\n{}", "Index weights:".bold());
        for weight in &job.output {
            let key = weight.key();
            let description = trait_info(&key).map(|t| t.description).unwrap_or_default();
            println!(
                "  {:<8} {:>12}  {}",
                key.cyan(),
                weight.display_mev(),
                description.dimmed()
            );
        }
    }
}

fn print_run_record(record: &RunRecord) {
    println!("\n{}", "Last run:".bold());
    println!("  Run:         {}", record.run_id.to_string().dimmed());
    println!(
        "  Started:     {}",
        record.started_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(finished) = record.finished_at {
        println!("  Finished:    {}", finished.format("%Y-%m-%d %H:%M:%S"));
        let seconds = finished.signed_duration_since(record.started_at).num_seconds();
        println!("  Duration:    {}s", seconds);
    }

    if let Some(code) = record.exit_code {
        println!("  Exit Code:   {}", code);
    }

    if let Some(message) = &record.message {
        println!("  Message:     {}", message.red());
    }
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Passed => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Processing => status_str.cyan(),
    }
}
