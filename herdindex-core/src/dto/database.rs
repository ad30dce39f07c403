//! Breed database DTOs

use serde::{Deserialize, Serialize};

use crate::domain::field::Field;

/// Description of a breed database and its fields in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub name: String,
    pub description: String,
    pub data_file: String,
    pub fields: Vec<Field>,
}
