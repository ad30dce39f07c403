//! Comparison DTOs

use serde::{Deserialize, Serialize};

/// A request to rank a database's records with a job's weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    pub database: String,
    pub job: String,
    /// Field keys to export, in output order
    pub columns: Vec<String>,
}

/// Ranked export of a comparison
///
/// `unmatched_traits` and `unmatched_columns` name what was skipped because
/// the database does not carry it. A non-empty `unmatched_traits` means the
/// scores are partial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub csv: Vec<u8>,
    pub records: usize,
    pub unmatched_traits: Vec<String>,
    pub unmatched_columns: Vec<String>,
}

impl Comparison {
    /// True when every job weight contributed to the score
    pub fn is_complete(&self) -> bool {
        self.unmatched_traits.is_empty()
    }
}
