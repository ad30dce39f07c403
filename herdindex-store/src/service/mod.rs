//! Service Module
//!
//! Business logic of the store. Services combine repository reads into
//! domain values: derived job status, breed databases and ranked
//! comparisons.

pub mod compare;
pub mod database;
pub mod job;

// Re-export for convenience
pub use database as database_service;
pub use job as job_service;

pub use database::BreedDatabase;
