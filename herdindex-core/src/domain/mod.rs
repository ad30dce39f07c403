//! Core domain types
//!
//! These types represent the business entities shared between the store
//! (which reads and writes them) and the runner (which produces job output).

pub mod field;
pub mod job;
pub mod params;
pub mod traits;
