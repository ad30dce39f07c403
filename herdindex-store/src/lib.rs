//! Herdindex Store
//!
//! Filesystem layer of the herdindex system.
//!
//! - `repository`: reads and writes job directories and breed-database
//!   directories, nothing more
//! - `service`: job lifecycle and status derivation, breed databases, and the
//!   scoring engine that ranks database records with a job's weights
//!
//! All roots come from a [`StoreConfig`] passed in by the caller.

pub mod config;
pub mod error;
pub mod repository;
pub mod service;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
