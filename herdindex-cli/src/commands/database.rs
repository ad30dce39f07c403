//! Database command handlers
//!
//! Handles breed database commands: listing, inspecting, health checks and
//! ranking a database against a job's index weights.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use herdindex_core::domain::field::Field;
use herdindex_core::dto::compare::CompareRequest;
use herdindex_store::service::database::BreedDatabase;
use herdindex_store::service::{database_service, job_service};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::config::Config;

/// Database subcommands
#[derive(Subcommand)]
pub enum DatabaseCommands {
    /// List all breed databases
    List,
    /// Show a database and its fields
    Show {
        /// Database name
        name: String,

        /// Preselect the fields scored by this job
        #[arg(long)]
        job: Option<String>,
    },
    /// Check that a database can be read
    Test {
        /// Database name
        name: String,
    },
    /// Rank a database's animals by a job's index and export them as CSV
    Compare {
        /// Database name
        name: String,

        /// Job providing the index weights
        #[arg(long)]
        job: String,

        /// Field key to export; repeat for several. Defaults to the fields the
        /// job scores plus the preselected ones
        #[arg(short, long = "column")]
        columns: Vec<String>,

        /// Write the CSV here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Handle database commands
///
/// # Arguments
/// * `command` - The database command to execute
/// * `config` - The CLI configuration
pub fn handle_database_command(command: DatabaseCommands, config: &Config) -> Result<()> {
    match command {
        DatabaseCommands::List => list_databases(config),
        DatabaseCommands::Show { name, job } => show_database(config, &name, job.as_deref()),
        DatabaseCommands::Test { name } => test_database(config, &name),
        DatabaseCommands::Compare {
            name,
            job,
            columns,
            out,
        } => {
            let req = CompareRequest {
                database: name,
                job,
                columns,
            };
            compare(config, req, out)
        }
    }
}

/// List databases; broken ones are listed with their problem
fn list_databases(config: &Config) -> Result<()> {
    let names = database_service::list_databases(&config.store)?;

    if names.is_empty() {
        println!("{}", "No databases found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} database(s):", names.len()).bold());
    println!();
    for name in names {
        match BreedDatabase::open(&config.store, &name) {
            Ok(db) => {
                let description = db.description().lines().next().unwrap_or_default();
                println!("  {} {}", "▸".cyan(), name.bold());
                println!("    {}", description.dimmed());
            }
            Err(e) => {
                warn!("Database {} cannot be opened: {}", name, e);
                println!("  {} {}", "✗".red(), name.bold());
                println!("    {}", e.public_message().red());
            }
        }
    }

    Ok(())
}

fn show_database(config: &Config, name: &str, job: Option<&str>) -> Result<()> {
    let db = BreedDatabase::open(&config.store, name)?;
    let summary = db.summary();

    let fields = match job {
        Some(job) => {
            let job = job_service::get_job(&config.store, config.user()?, job)?;
            db.fields_for_job(&job)
        }
        None => summary.fields.clone(),
    };

    println!("{}", "Database Details:".bold());
    println!("  Name:      {}", summary.name.cyan());
    println!("  Data file: {}", summary.data_file.dimmed());
    println!();
    println!("{}", summary.description);
    println!();
    println!("{}", format!("Fields ({}):", fields.len()).bold());
    for field in &fields {
        print_field(field);
    }

    Ok(())
}

fn test_database(config: &Config, name: &str) -> Result<()> {
    database_service::test_database(&config.store, name)?;
    println!("{}", format!("✓ Database '{}' is healthy", name).green());
    Ok(())
}

/// Ranks the database against the job and writes the CSV
///
/// Traits and columns the database cannot provide are reported on stderr.
fn compare(config: &Config, req: CompareRequest, out: Option<PathBuf>) -> Result<()> {
    let db = BreedDatabase::open(&config.store, &req.database)?;
    let job = job_service::get_job(&config.store, config.user()?, &req.job)?;

    let columns = if req.columns.is_empty() {
        db.default_columns(&job)
    } else {
        req.columns
    };

    let comparison = db.compare_job(&job, &columns)?;

    match &out {
        Some(path) => std::fs::write(path, &comparison.csv)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&comparison.csv)?;
            stdout.flush()?;
        }
    }

    for key in &comparison.unmatched_traits {
        eprintln!(
            "{} trait {} is not in database {}; it does not count towards the index",
            "warning:".yellow().bold(),
            key,
            db.name()
        );
    }
    for key in &comparison.unmatched_columns {
        eprintln!(
            "{} column {} is not in database {}",
            "warning:".yellow().bold(),
            key,
            db.name()
        );
    }

    if let Some(path) = out {
        eprintln!(
            "{}",
            format!(
                "✓ Ranked {} record(s) of '{}' by job '{}' into {}",
                comparison.records,
                db.name(),
                job.name,
                path.display()
            )
            .green()
        );
    }

    Ok(())
}

fn print_field(field: &Field) {
    let marker = if field.selected_by_default {
        "✓".green()
    } else {
        " ".normal()
    };

    println!(
        "  {} {:<10} {:<24} {}",
        marker,
        field.key.cyan(),
        field.header_name,
        field.comment.dimmed()
    );
}
