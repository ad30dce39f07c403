//! Data Transfer Objects
//!
//! Lightweight request and response shapes passed between the store, the
//! runner and the CLI.

pub mod compare;
pub mod database;
pub mod job;
