//! Breed Database Repository
//!
//! Reads breed-database directories. Each directory holds exactly one CSV
//! data file, a relaxed-JSON field cross-reference and a plain-text
//! description.

use herdindex_core::domain::field::{ID_FIELD, Xref, XrefEntry};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::files::{list_dirs, parse_relaxed, read_optional};
use crate::config::{StoreConfig, validate_name};
use crate::error::{Result, StoreError};

pub const XREF_FILE: &str = "comp_fn_pairs.hjson";
pub const DESCRIPTION_FILE: &str = "README";
pub const DATA_EXTENSION: &str = "csv";

/// Sorted names of every database under the databases root
pub fn list(config: &StoreConfig) -> Result<Vec<String>> {
    Ok(list_dirs(&config.databases_root)?
        .into_iter()
        .filter(|name| validate_name("database", name).is_ok())
        .collect())
}

/// Reads the free-text description
pub fn read_description(dir: &Path, database: &str) -> Result<String> {
    let path = dir.join(DESCRIPTION_FILE);
    let bytes = read_optional(&path)?
        .ok_or_else(|| StoreError::config(database, format!("missing {DESCRIPTION_FILE}")))?;

    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}

/// Loads the field cross-reference and checks the identity field is mapped
pub fn read_xref(dir: &Path, database: &str) -> Result<Xref> {
    let path = dir.join(XREF_FILE);
    let bytes = read_optional(&path)?
        .ok_or_else(|| StoreError::config(database, format!("missing {XREF_FILE}")))?;

    let text = String::from_utf8_lossy(&bytes);
    let entries: Vec<XrefEntry> = parse_relaxed(&text)
        .map_err(|reason| StoreError::config(database, format!("malformed {XREF_FILE}: {reason}")))?;

    let xref = Xref::from_entries(entries);
    if !xref.has_identity() {
        return Err(StoreError::config(
            database,
            format!("{XREF_FILE} does not map the {ID_FIELD} field"),
        ));
    }

    Ok(xref)
}

/// Locates the single CSV data file of a database directory
pub fn find_data_file(dir: &Path, database: &str) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::DatabaseNotFound(database.to_string()),
        _ => StoreError::io(format!("listing {}", dir.display()), e),
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| StoreError::io(format!("listing {}", dir.display()), e))?
            .path();
        let is_csv = path.extension().is_some_and(|ext| ext == DATA_EXTENSION);
        if is_csv && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(StoreError::integrity(database, "could not find a csv data file")),
        1 => Ok(candidates.remove(0)),
        n => Err(StoreError::integrity(
            database,
            format!("found {n} csv data files, expected exactly one"),
        )),
    }
}
