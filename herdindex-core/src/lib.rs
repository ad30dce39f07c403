//! Herdindex Core
//!
//! Core types for the herdindex selection-index system.
//!
//! This crate contains:
//! - Domain types: traits and components, database fields, jobs, run records
//!   and the parameter documents handed to the external computation
//! - DTOs: lightweight views exchanged between the store, the runner and the CLI
//!
//! Nothing in this crate touches the filesystem.

pub mod domain;
pub mod dto;
