//! File helpers shared by the repositories

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{Result, StoreError};

/// Reads a file, returning `None` when it does not exist
pub(crate) fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(format!("reading {}", path.display()), e)),
    }
}

/// Parses relaxed JSON (Hjson), which also accepts plain JSON
///
/// The text goes through a generic value first so that types using
/// `#[serde(flatten)]` see the same input shape as with plain JSON.
pub(crate) fn parse_relaxed<T: DeserializeOwned>(text: &str) -> std::result::Result<T, String> {
    let value: serde_json::Value = deser_hjson::from_str(text).map_err(|e| e.to_string())?;
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Canonical encoding of every JSON document the store writes
pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Writes a file atomically using write-to-temp-then-rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut temp_file = File::create(&temp_path)
        .map_err(|e| StoreError::io(format!("creating {}", temp_path.display()), e))?;

    temp_file
        .write_all(bytes)
        .and_then(|_| temp_file.sync_all())
        .map_err(|e| StoreError::io(format!("writing {}", temp_path.display()), e))?;

    fs::rename(&temp_path, path).map_err(|e| {
        StoreError::io(
            format!("renaming {} to {}", temp_path.display(), path.display()),
            e,
        )
    })
}

/// Removes a file, returning whether it existed
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(format!("removing {}", path.display()), e)),
    }
}

/// Sorted names of the sub-directories of `dir`; a missing `dir` is empty
pub(crate) fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(format!("listing {}", dir.display()), e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(format!("listing {}", dir.display()), e))?;
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => tracing::debug!("Skipping non UTF-8 directory {:?}", name),
        }
    }

    names.sort();
    Ok(names)
}
