//! Job Repository
//!
//! Handles all filesystem operations on job directories:
//!
//! ```text
//! <users_root>/users/<user>/jobs/<job>/
//!     masterParams.json   input
//!     ecoParams.json      input
//!     output.json         written by the external computation
//!     status.json         latest run record
//!     .processing         present only while a run, create or delete holds the job
//! ```

use herdindex_core::domain::job::{JobOutput, RunRecord};
use herdindex_core::domain::params::{EcoParams, MasterParams};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::files::{
    list_dirs, parse_relaxed, read_optional, remove_if_exists, to_pretty_json, write_atomic,
};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

pub const MASTER_PARAMS_FILE: &str = "masterParams.json";
pub const ECO_PARAMS_FILE: &str = "ecoParams.json";
pub const OUTPUT_FILE: &str = "output.json";
pub const STATUS_FILE: &str = "status.json";
pub const SENTINEL_FILE: &str = ".processing";

/// Resolved locations of one job's files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub user: String,
    pub name: String,
    pub dir: PathBuf,
    pub master_params: PathBuf,
    pub eco_params: PathBuf,
    pub output: PathBuf,
    pub status: PathBuf,
    pub sentinel: PathBuf,
}

impl JobPaths {
    /// Resolves a job's paths, rejecting unsafe user or job names
    pub fn resolve(config: &StoreConfig, user: &str, name: &str) -> Result<Self> {
        let dir = config.job_dir(user, name)?;

        Ok(Self {
            user: user.to_string(),
            name: name.to_string(),
            master_params: dir.join(MASTER_PARAMS_FILE),
            eco_params: dir.join(ECO_PARAMS_FILE),
            output: dir.join(OUTPUT_FILE),
            status: dir.join(STATUS_FILE),
            sentinel: dir.join(SENTINEL_FILE),
            dir,
        })
    }

    /// `user/job`, used in logs and errors
    pub fn label(&self) -> String {
        format!("{}/{}", self.user, self.name)
    }
}

/// Content of a job's output file
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFile {
    Missing,
    Unreadable(String),
    Parsed(JobOutput),
}

/// Writes both parameter documents, creating the job directory if needed
///
/// Both documents are encoded before anything touches the disk.
pub fn write_params(paths: &JobPaths, master: &MasterParams, eco: &EcoParams) -> Result<()> {
    let master_bytes = to_pretty_json(master)?;
    let eco_bytes = to_pretty_json(eco)?;

    fs::create_dir_all(&paths.dir)
        .map_err(|e| StoreError::io(format!("creating {}", paths.dir.display()), e))?;

    write_atomic(&paths.master_params, &master_bytes)?;
    write_atomic(&paths.eco_params, &eco_bytes)?;

    Ok(())
}

/// Reads both parameter documents; `None` if either file is absent
pub fn read_params(paths: &JobPaths) -> Result<Option<(MasterParams, EcoParams)>> {
    let Some(master) = read_document::<MasterParams>(&paths.master_params)? else {
        return Ok(None);
    };
    let Some(eco) = read_document::<EcoParams>(&paths.eco_params)? else {
        return Ok(None);
    };

    Ok(Some((master, eco)))
}

/// Parses a submitted parameter document, relaxed JSON accepted
///
/// `source` names the document in the error.
pub fn parse_document<T: serde::de::DeserializeOwned>(source: &str, text: &str) -> Result<T> {
    parse_relaxed(text).map_err(|reason| StoreError::DataFormat(format!("{source}: {reason}")))
}

fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };

    let text = String::from_utf8_lossy(&bytes);
    parse_document(&path.display().to_string(), &text).map(Some)
}

/// Reads the output file without judging what it means for the job status
pub fn read_output(paths: &JobPaths) -> Result<OutputFile> {
    let Some(bytes) = read_optional(&paths.output)? else {
        return Ok(OutputFile::Missing);
    };

    let text = String::from_utf8_lossy(&bytes);
    Ok(match parse_relaxed::<JobOutput>(&text) {
        Ok(output) => OutputFile::Parsed(output),
        Err(reason) => OutputFile::Unreadable(reason),
    })
}

/// Removes the output file left by a previous run
pub fn remove_output(paths: &JobPaths) -> Result<bool> {
    remove_if_exists(&paths.output)
}

/// Reads the run record; a record that cannot be decoded counts as absent
pub fn read_status(paths: &JobPaths) -> Result<Option<RunRecord>> {
    let Some(bytes) = read_optional(&paths.status)? else {
        return Ok(None);
    };

    match serde_json::from_slice(&bytes) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable run record of job {}: {}", paths.label(), e);
            Ok(None)
        }
    }
}

/// Atomically replaces the run record
pub fn write_status(paths: &JobPaths, record: &RunRecord) -> Result<()> {
    write_atomic(&paths.status, &to_pretty_json(record)?)
}

pub fn remove_status(paths: &JobPaths) -> Result<bool> {
    remove_if_exists(&paths.status)
}

pub fn sentinel_exists(paths: &JobPaths) -> bool {
    paths.sentinel.exists()
}

/// Removes a sentinel left behind by a run that never finished
pub fn clear_sentinel(paths: &JobPaths) -> Result<bool> {
    remove_if_exists(&paths.sentinel)
}

/// Exclusive hold on a job for the length of one run
///
/// The sentinel file is created with create-new semantics, so only one
/// holder can exist per job across processes. Dropping the lock removes it.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    label: String,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Released run lock of job {}", self.label),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Failed to release run lock of job {}: {}", self.label, e),
        }
    }
}

/// Takes the job's run lock, writing the sentinel
pub fn acquire_run_lock(paths: &JobPaths) -> Result<RunLock> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&paths.sentinel)
    {
        Ok(_) => Ok(RunLock {
            path: paths.sentinel.clone(),
            label: paths.label(),
        }),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::JobBusy(paths.label())),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::JobNotFound(paths.label())),
        Err(e) => Err(StoreError::io(
            format!("creating {}", paths.sentinel.display()),
            e,
        )),
    }
}

/// Creates the job directory if it does not exist yet
pub fn create_dir(paths: &JobPaths) -> Result<()> {
    fs::create_dir_all(&paths.dir)
        .map_err(|e| StoreError::io(format!("creating {}", paths.dir.display()), e))
}

pub fn exists(paths: &JobPaths) -> bool {
    paths.dir.is_dir()
}

/// Recursively removes the job directory
pub fn delete(paths: &JobPaths) -> Result<()> {
    fs::remove_dir_all(&paths.dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::JobNotFound(paths.label()),
        _ => StoreError::io(format!("removing {}", paths.dir.display()), e),
    })
}

/// Sorted job names of a user
pub fn list_names(config: &StoreConfig, user: &str) -> Result<Vec<String>> {
    Ok(list_dirs(&config.jobs_dir(user)?)?
        .into_iter()
        .filter(|name| crate::config::validate_name("job", name).is_ok())
        .collect())
}

/// Sorted names of every user with a namespace
pub fn list_users(config: &StoreConfig) -> Result<Vec<String>> {
    Ok(list_dirs(&config.users_dir())?
        .into_iter()
        .filter(|name| crate::config::validate_name("user", name).is_ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdindex_core::domain::job::JobStatus;

    fn setup() -> (tempfile::TempDir, StoreConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("users"), dir.path().join("epds"));
        (dir, config)
    }

    fn sample_params() -> (MasterParams, EcoParams) {
        let master: MasterParams = serde_json::from_str(
            r#"{"Comment": "spring", "TargetDatabase": "Angus", "genetic": [0.1, 0.2]}"#,
        )
        .unwrap();
        let eco: EcoParams =
            serde_json::from_str(r#"{"saleEndpoint": "weaning", "indexComponents": ["WW,D"]}"#)
                .unwrap();
        (master, eco)
    }

    #[test]
    fn test_params_round_trip_is_byte_identical() {
        let (_dir, config) = setup();
        let paths = JobPaths::resolve(&config, "alice", "spring").unwrap();
        let (master, eco) = sample_params();

        write_params(&paths, &master, &eco).unwrap();
        let first_master = fs::read(&paths.master_params).unwrap();
        let first_eco = fs::read(&paths.eco_params).unwrap();

        let (read_master, read_eco) = read_params(&paths).unwrap().unwrap();
        assert_eq!(read_master, master);
        assert_eq!(read_eco, eco);

        write_params(&paths, &read_master, &read_eco).unwrap();
        assert_eq!(fs::read(&paths.master_params).unwrap(), first_master);
        assert_eq!(fs::read(&paths.eco_params).unwrap(), first_eco);
    }

    #[test]
    fn test_missing_params() {
        let (_dir, config) = setup();
        let paths = JobPaths::resolve(&config, "alice", "spring").unwrap();
        assert!(read_params(&paths).unwrap().is_none());

        let (master, eco) = sample_params();
        write_params(&paths, &master, &eco).unwrap();
        fs::remove_file(&paths.eco_params).unwrap();
        assert!(read_params(&paths).unwrap().is_none());
    }

    #[test]
    fn test_read_output_variants() {
        let (_dir, config) = setup();
        let paths = JobPaths::resolve(&config, "alice", "spring").unwrap();
        fs::create_dir_all(&paths.dir).unwrap();

        assert_eq!(read_output(&paths).unwrap(), OutputFile::Missing);

        fs::write(&paths.output, "not { json").unwrap();
        assert!(matches!(read_output(&paths).unwrap(), OutputFile::Unreadable(_)));

        fs::write(
            &paths.output,
            "{\n  indexElement: [\n    {\n      trait: WW\n      component: D\n      mev: 2.5\n    }\n  ]\n}",
        )
        .unwrap();
        match read_output(&paths).unwrap() {
            OutputFile::Parsed(output) => {
                assert_eq!(output.elements.len(), 1);
                assert_eq!(output.elements[0].key(), "WW,D");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_status_record_round_trip() {
        let (_dir, config) = setup();
        let paths = JobPaths::resolve(&config, "alice", "spring").unwrap();
        fs::create_dir_all(&paths.dir).unwrap();

        assert!(read_status(&paths).unwrap().is_none());

        let record = RunRecord::started();
        write_status(&paths, &record).unwrap();
        assert_eq!(read_status(&paths).unwrap(), Some(record.clone()));

        let done = record.finish(JobStatus::Passed, Some(0), None);
        write_status(&paths, &done).unwrap();
        assert_eq!(read_status(&paths).unwrap().map(|r| r.state), Some(JobStatus::Passed));

        fs::write(&paths.status, "garbage").unwrap();
        assert!(read_status(&paths).unwrap().is_none());
    }

    #[test]
    fn test_run_lock_is_exclusive() {
        let (_dir, config) = setup();
        let paths = JobPaths::resolve(&config, "alice", "spring").unwrap();

        assert!(matches!(
            acquire_run_lock(&paths),
            Err(StoreError::JobNotFound(_))
        ));

        fs::create_dir_all(&paths.dir).unwrap();
        let lock = acquire_run_lock(&paths).unwrap();
        assert!(sentinel_exists(&paths));
        assert_eq!(fs::metadata(lock.path()).unwrap().len(), 0);
        assert!(matches!(acquire_run_lock(&paths), Err(StoreError::JobBusy(_))));

        drop(lock);
        assert!(!sentinel_exists(&paths));
        assert!(acquire_run_lock(&paths).is_ok());
    }

    #[test]
    fn test_delete_and_list() {
        let (_dir, config) = setup();
        let (master, eco) = sample_params();
        for name in ["b-job", "a_job"] {
            let paths = JobPaths::resolve(&config, "alice", name).unwrap();
            write_params(&paths, &master, &eco).unwrap();
        }

        assert_eq!(list_names(&config, "alice").unwrap(), vec!["a_job", "b-job"]);
        assert_eq!(list_users(&config).unwrap(), vec!["alice"]);
        assert!(list_names(&config, "bob").unwrap().is_empty());

        let paths = JobPaths::resolve(&config, "alice", "a_job").unwrap();
        delete(&paths).unwrap();
        assert!(!exists(&paths));
        assert!(matches!(delete(&paths), Err(StoreError::JobNotFound(_))));
        assert_eq!(list_names(&config, "alice").unwrap(), vec!["b-job"]);
    }
}
