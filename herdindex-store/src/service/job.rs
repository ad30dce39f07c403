//! Job Service
//!
//! Job lifecycle and status derivation.
//!
//! A job's status is derived each time it is read, highest priority first:
//! 1. sentinel present: `Processing`
//! 2. run record failed, or still processing without a sentinel: `Failed`
//! 3. output file parses: the status it encodes, with its weights
//! 4. anything else: `Failed`

use herdindex_core::domain::job::{Job, JobStatus, RunRecord};
use herdindex_core::domain::params::{EcoParams, MasterParams};
use herdindex_core::domain::traits::TraitWeight;
use herdindex_core::dto::job::CreateJob;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::repository::job::{JobPaths, OutputFile};
use crate::repository::job_repository;

/// Message recorded on runs found unfinished by reconciliation
pub const INTERRUPTED_MESSAGE: &str = "interrupted before completion";

/// Persist a job's parameters without running it
///
/// Re-creating an existing job replaces its parameters and discards results
/// computed from the old ones. A job that is currently running cannot be
/// re-created.
pub fn create_job(config: &StoreConfig, user: &str, req: CreateJob) -> Result<Job> {
    let paths = JobPaths::resolve(config, user, &req.name)?;

    job_repository::create_dir(&paths)?;
    {
        let _lock = job_repository::acquire_run_lock(&paths)?;
        job_repository::write_params(&paths, &req.master, &req.eco)?;
        job_repository::remove_output(&paths)?;
        job_repository::remove_status(&paths)?;
    }

    info!("Job {} created", paths.label());

    get_job(config, user, &req.name)
}

/// Get a job with its derived status
pub fn get_job(config: &StoreConfig, user: &str, name: &str) -> Result<Job> {
    let paths = JobPaths::resolve(config, user, name)?;

    let (master, eco) = job_repository::read_params(&paths)?
        .ok_or_else(|| StoreError::JobNotFound(paths.label()))?;

    let sentinel = job_repository::sentinel_exists(&paths);
    let record = job_repository::read_status(&paths)?;

    let (status, output) = derive_status(sentinel, record.as_ref(), || {
        job_repository::read_output(&paths)
    })?;

    debug!("Job {} status {}", paths.label(), status);

    Ok(Job {
        owner: user.to_string(),
        name: name.to_string(),
        status,
        comment: master.comment,
        target_database: master.target_database,
        sale_endpoint: eco.sale_endpoint,
        output,
        last_run: record,
    })
}

/// Derives status from the job's artifacts
///
/// The output file is only read when no run is in progress.
pub fn derive_status<F>(
    sentinel: bool,
    record: Option<&RunRecord>,
    read_output: F,
) -> Result<(JobStatus, Vec<TraitWeight>)>
where
    F: FnOnce() -> Result<OutputFile>,
{
    if sentinel {
        return Ok((JobStatus::Processing, Vec::new()));
    }

    // The sentinel is the run lock, so an open record without it is a dead run.
    if record.is_some_and(|r| !r.is_finished() || r.state == JobStatus::Failed) {
        return Ok((JobStatus::Failed, Vec::new()));
    }

    Ok(match read_output()? {
        OutputFile::Parsed(output) => match JobStatus::from(output.status) {
            JobStatus::Passed => (JobStatus::Passed, output.elements),
            status => (status, Vec::new()),
        },
        OutputFile::Unreadable(reason) => {
            warn!("Job output unreadable: {}", reason);
            (JobStatus::Failed, Vec::new())
        }
        OutputFile::Missing => (JobStatus::Failed, Vec::new()),
    })
}

/// Get the parameter documents a job was created with
pub fn get_job_params(
    config: &StoreConfig,
    user: &str,
    name: &str,
) -> Result<(MasterParams, EcoParams)> {
    let paths = JobPaths::resolve(config, user, name)?;
    job_repository::read_params(&paths)?.ok_or_else(|| StoreError::JobNotFound(paths.label()))
}

/// Builds a creation request from submitted parameter documents
///
/// Both documents may be relaxed JSON. Unknown keys are kept.
pub fn parse_create_request(name: &str, master: &str, eco: &str) -> Result<CreateJob> {
    Ok(CreateJob {
        name: name.to_string(),
        master: job_repository::parse_document("master parameters", master)?,
        eco: job_repository::parse_document("economic parameters", eco)?,
    })
}

pub fn job_exists(config: &StoreConfig, user: &str, name: &str) -> Result<bool> {
    let paths = JobPaths::resolve(config, user, name)?;
    Ok(job_repository::exists(&paths))
}

/// Delete a job and everything stored for it
///
/// Refused while a run holds the job's lock. The lock is held until the
/// directory is gone.
pub fn delete_job(config: &StoreConfig, user: &str, name: &str) -> Result<()> {
    let paths = JobPaths::resolve(config, user, name)?;

    if !job_repository::exists(&paths) {
        return Err(StoreError::JobNotFound(paths.label()));
    }

    let lock = job_repository::acquire_run_lock(&paths)?;
    job_repository::delete(&paths)?;
    drop(lock);

    info!("Job {} deleted", paths.label());

    Ok(())
}

/// List a user's job names
pub fn list_jobs(config: &StoreConfig, user: &str) -> Result<Vec<String>> {
    job_repository::list_names(config, user)
}

/// Get every job of a user
///
/// Any job that cannot be read fails the whole listing.
pub fn get_all_jobs(config: &StoreConfig, user: &str) -> Result<Vec<Job>> {
    list_jobs(config, user)?
        .iter()
        .map(|name| get_job(config, user, name))
        .collect()
}

/// Mark runs left unfinished by a previous process as failed
///
/// Meant for startup, while no runner is active. A job with a sentinel or a
/// processing run record gets a failed record and loses its sentinel; a job
/// whose record already finished only loses the sentinel. Returns the
/// `(user, job)` pairs that were touched.
pub fn reconcile_stale_runs(config: &StoreConfig) -> Result<Vec<(String, String)>> {
    let mut reconciled = Vec::new();

    for user in job_repository::list_users(config)? {
        for name in job_repository::list_names(config, &user)? {
            let paths = JobPaths::resolve(config, &user, &name)?;
            let sentinel = job_repository::sentinel_exists(&paths);
            let record = job_repository::read_status(&paths)?;
            let unfinished = record.as_ref().is_some_and(|r| !r.is_finished());

            if !sentinel && !unfinished {
                continue;
            }

            if unfinished || record.is_none() {
                let record = record.unwrap_or_else(RunRecord::started).finish(
                    JobStatus::Failed,
                    None,
                    Some(INTERRUPTED_MESSAGE.to_string()),
                );
                job_repository::write_status(&paths, &record)?;
            }
            job_repository::clear_sentinel(&paths)?;

            warn!("Job {} was left processing, reconciled", paths.label());
            reconciled.push((user.clone(), name));
        }
    }

    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const OUTPUT: &str = r#"{"indexElement": [{"trait": "WW", "component": "D", "mev": 2.0}]}"#;

    fn setup() -> (tempfile::TempDir, StoreConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("data"), dir.path().join("epds"));
        (dir, config)
    }

    fn request(name: &str) -> CreateJob {
        CreateJob {
            name: name.to_string(),
            master: serde_json::from_str(
                r#"{"Comment": "spring calving", "TargetDatabase": "Angus", "burnin": 5}"#,
            )
            .unwrap(),
            eco: serde_json::from_str(r#"{"saleEndpoint": "weaning", "indexComponents": []}"#)
                .unwrap(),
        }
    }

    fn paths(config: &StoreConfig, name: &str) -> JobPaths {
        JobPaths::resolve(config, "alice", name).unwrap()
    }

    #[test]
    fn test_create_job_reports_inputs() {
        let (_dir, config) = setup();
        let job = create_job(&config, "alice", request("spring")).unwrap();

        assert_eq!(job.owner, "alice");
        assert_eq!(job.comment, "spring calving");
        assert_eq!(job.target_database, "Angus");
        assert_eq!(job.sale_endpoint, "weaning");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.output.is_empty());
        assert!(job_exists(&config, "alice", "spring").unwrap());
    }

    #[test]
    fn test_params_read_back_byte_identical() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        let p = paths(&config, "spring");
        let master_bytes = fs::read(&p.master_params).unwrap();

        let (master, eco) = get_job_params(&config, "alice", "spring").unwrap();
        let req = CreateJob {
            name: "copy".into(),
            master,
            eco,
        };
        create_job(&config, "alice", req).unwrap();

        assert_eq!(fs::read(paths(&config, "copy").master_params).unwrap(), master_bytes);
    }

    #[test]
    fn test_sentinel_without_output_is_processing() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        fs::write(paths(&config, "spring").sentinel, b"").unwrap();

        let job = get_job(&config, "alice", "spring").unwrap();
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn test_sentinel_wins_over_broken_output() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        let p = paths(&config, "spring");
        fs::write(&p.sentinel, b"").unwrap();
        fs::write(&p.output, b"{ half written").unwrap();

        let job = get_job(&config, "alice", "spring").unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.output.is_empty());
    }

    #[test]
    fn test_valid_output_is_passed() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        fs::write(paths(&config, "spring").output, OUTPUT).unwrap();

        let job = get_job(&config, "alice", "spring").unwrap();
        assert_eq!(job.status, JobStatus::Passed);
        assert_eq!(job.output.len(), 1);
        assert_eq!(job.output[0].key(), "WW,D");
    }

    #[test]
    fn test_output_encoded_failure() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        fs::write(
            paths(&config, "spring").output,
            r#"{"indexElement": [], "status": "failed"}"#,
        )
        .unwrap();

        let job = get_job(&config, "alice", "spring").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn test_unparseable_output_is_failed() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        fs::write(paths(&config, "spring").output, b"[1, 2").unwrap();

        let job = get_job(&config, "alice", "spring").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.comment, "spring calving");
    }

    #[test]
    fn test_run_record_precedence() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        let p = paths(&config, "spring");
        fs::write(&p.output, OUTPUT).unwrap();

        let record = RunRecord::started();
        job_repository::write_status(&p, &record).unwrap();
        assert_eq!(
            get_job(&config, "alice", "spring").unwrap().status,
            JobStatus::Failed
        );

        fs::write(&p.sentinel, b"").unwrap();
        assert_eq!(
            get_job(&config, "alice", "spring").unwrap().status,
            JobStatus::Processing
        );
        fs::remove_file(&p.sentinel).unwrap();

        let failed = record.finish(JobStatus::Failed, Some(1), Some("exit status 1".into()));
        job_repository::write_status(&p, &failed).unwrap();
        let job = get_job(&config, "alice", "spring").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.output.is_empty());
        assert_eq!(job.last_run.and_then(|r| r.exit_code), Some(1));
    }

    #[test]
    fn test_missing_job_is_not_found() {
        let (_dir, config) = setup();
        assert!(matches!(
            get_job(&config, "alice", "nothing"),
            Err(StoreError::JobNotFound(_))
        ));
        assert!(matches!(
            get_job_params(&config, "alice", "nothing"),
            Err(StoreError::JobNotFound(_))
        ));
        assert!(matches!(
            get_job(&config, "alice", ".."),
            Err(StoreError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_recreate_discards_old_results() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        fs::write(paths(&config, "spring").output, OUTPUT).unwrap();

        let job = create_job(&config, "alice", request("spring")).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(!paths(&config, "spring").output.exists());
    }

    #[test]
    fn test_delete_job() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        let p = paths(&config, "spring");

        fs::write(&p.sentinel, b"").unwrap();
        assert!(matches!(
            delete_job(&config, "alice", "spring"),
            Err(StoreError::JobBusy(_))
        ));
        assert!(matches!(
            create_job(&config, "alice", request("spring")),
            Err(StoreError::JobBusy(_))
        ));

        fs::remove_file(&p.sentinel).unwrap();
        create_job(&config, "alice", request("spring")).unwrap();
        assert!(!p.sentinel.exists());
        delete_job(&config, "alice", "spring").unwrap();
        assert!(!p.dir.exists());
        assert!(matches!(
            delete_job(&config, "alice", "spring"),
            Err(StoreError::JobNotFound(_))
        ));
    }

    #[test]
    fn test_get_all_jobs_fails_loud() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("a")).unwrap();
        create_job(&config, "alice", request("b")).unwrap();
        fs::write(paths(&config, "a").output, OUTPUT).unwrap();

        let jobs = get_all_jobs(&config, "alice").unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].status, JobStatus::Passed);
        assert_eq!(list_jobs(&config, "alice").unwrap(), vec!["a", "b"]);

        fs::remove_file(paths(&config, "b").eco_params).unwrap();
        assert!(get_all_jobs(&config, "alice").is_err());
    }

    #[test]
    fn test_reconcile_stale_runs() {
        let (_dir, config) = setup();
        for name in ["crashed", "legacy", "clean", "lingering"] {
            create_job(&config, "alice", request(name)).unwrap();
        }
        job_repository::write_status(&paths(&config, "crashed"), &RunRecord::started()).unwrap();
        fs::write(paths(&config, "crashed").sentinel, b"").unwrap();
        fs::write(paths(&config, "legacy").sentinel, b"").unwrap();

        let p = paths(&config, "lingering");
        fs::write(&p.output, OUTPUT).unwrap();
        let done = RunRecord::started().finish(JobStatus::Passed, Some(0), None);
        job_repository::write_status(&p, &done).unwrap();
        fs::write(&p.sentinel, b"").unwrap();

        let reconciled = reconcile_stale_runs(&config).unwrap();
        let names: Vec<&str> = reconciled.iter().map(|(_, job)| job.as_str()).collect();
        assert_eq!(names, vec!["crashed", "legacy", "lingering"]);

        for name in ["crashed", "legacy"] {
            let job = get_job(&config, "alice", name).unwrap();
            assert_eq!(job.status, JobStatus::Failed);
            let record = job.last_run.unwrap();
            assert_eq!(record.message.as_deref(), Some(INTERRUPTED_MESSAGE));
        }
        assert_eq!(
            get_job(&config, "alice", "lingering").unwrap().status,
            JobStatus::Passed
        );
        assert!(reconcile_stale_runs(&config).unwrap().is_empty());
    }

    #[test]
    fn test_parse_create_request_accepts_hjson() {
        let master = "{\n  # planning\n  Comment: spring calving\n  planningHorizon: 10\n  customKey: [1, 2]\n}";
        let eco = r#"{"saleEndpoint": "weaning", "indexComponents": ["WW,D"]}"#;

        let req = parse_create_request("spring", master, eco).unwrap();
        assert_eq!(req.master.comment, "spring calving");
        assert_eq!(req.master.planning_horizon, Some(10));
        assert!(req.master.extra.contains_key("customKey"));
        assert!(req.eco.has_component("WW, D"));

        let err = parse_create_request("spring", "{ broken", eco).unwrap_err();
        assert!(matches!(err, StoreError::DataFormat(ref m) if m.starts_with("master parameters")));
    }

    #[test]
    fn test_create_and_delete_wait_for_held_lock() {
        let (_dir, config) = setup();
        create_job(&config, "alice", request("spring")).unwrap();
        let p = paths(&config, "spring");

        let lock = job_repository::acquire_run_lock(&p).unwrap();
        assert!(matches!(
            create_job(&config, "alice", request("spring")),
            Err(StoreError::JobBusy(_))
        ));
        assert!(matches!(
            delete_job(&config, "alice", "spring"),
            Err(StoreError::JobBusy(_))
        ));
        assert!(p.master_params.exists());
        drop(lock);

        assert!(!p.sentinel.exists());
        assert_eq!(
            create_job(&config, "alice", request("spring")).unwrap().status,
            JobStatus::Failed
        );
    }

    #[test]
    fn test_derive_status_skips_output_while_processing() {
        let (status, output) =
            derive_status(true, None, || panic!("output read while processing")).unwrap();
        assert_eq!(status, JobStatus::Processing);
        assert!(output.is_empty());
    }
}
