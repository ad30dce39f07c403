//! Repository Module
//!
//! Filesystem access for job directories and breed-database directories.
//! Repositories know the on-disk layout and file formats and nothing else;
//! status rules and scoring live in the service layer.

pub mod database;
mod files;
pub mod job;

// Re-export for convenience
pub use database as database_repository;
pub use job as job_repository;
