//! Breed Database Service
//!
//! A [`BreedDatabase`] is opened on demand for each request and is
//! read-only for its lifetime. Opening validates the directory: the
//! description and cross-reference must load and exactly one CSV data file
//! must exist.

use herdindex_core::domain::field::{Field, Xref};
use herdindex_core::domain::job::Job;
use herdindex_core::domain::params::{EcoParams, MasterParams};
use herdindex_core::dto::database::DatabaseSummary;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::repository::database_repository;

/// One breed database directory
#[derive(Debug, Clone)]
pub struct BreedDatabase {
    name: String,
    dir: PathBuf,
    description: String,
    data_file: PathBuf,
    xref: Xref,
}

impl BreedDatabase {
    /// Opens and validates a database by name
    pub fn open(config: &StoreConfig, name: &str) -> Result<Self> {
        let dir = config.database_dir(name)?;
        if !dir.is_dir() {
            return Err(StoreError::DatabaseNotFound(name.to_string()));
        }

        let description = database_repository::read_description(&dir, name)?;
        let xref = database_repository::read_xref(&dir, name)?;
        let data_file = database_repository::find_data_file(&dir, name)?;

        debug!(
            "Opened database {} with {} fields, data file {}",
            name,
            xref.len(),
            data_file.display()
        );

        Ok(Self {
            name: name.to_string(),
            dir,
            description,
            data_file,
            xref,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// CSV data file found when the database was opened
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn xref(&self) -> &Xref {
        &self.xref
    }

    /// Fields in display order
    pub fn field_listing(&self) -> Vec<Field> {
        self.xref.field_listing()
    }

    /// Fields in display order, with the job's weighted traits selected
    pub fn fields_for_job(&self, job: &Job) -> Vec<Field> {
        self.xref.field_listing_selecting(&job.output_keys())
    }

    /// Keys of the columns exported by default when comparing `job`
    pub fn default_columns(&self, job: &Job) -> Vec<String> {
        self.fields_for_job(job)
            .into_iter()
            .filter(|f| f.selected_by_default)
            .map(|f| f.key)
            .collect()
    }

    /// Trait keys this database carries out of `requested`
    pub fn trait_keys<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        self.xref.trait_keys(requested)
    }

    /// Health check against the current state of the directory
    ///
    /// Re-reads the cross-reference and checks that exactly one CSV file can
    /// be opened. CSV content is not inspected.
    pub fn test(&self) -> Result<()> {
        database_repository::read_xref(&self.dir, &self.name)?;
        let data_file = database_repository::find_data_file(&self.dir, &self.name)?;
        File::open(&data_file)
            .map_err(|e| StoreError::io(format!("opening {}", data_file.display()), e))?;
        Ok(())
    }

    pub fn summary(&self) -> DatabaseSummary {
        DatabaseSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            data_file: self
                .data_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            fields: self.field_listing(),
        }
    }
}

/// List the names of all breed databases
pub fn list_databases(config: &StoreConfig) -> Result<Vec<String>> {
    database_repository::list(config)
}

/// Open a database and run its health check
pub fn test_database(config: &StoreConfig, name: &str) -> Result<()> {
    BreedDatabase::open(config, name)?.test()?;
    info!("Database {} passed its health check", name);
    Ok(())
}

/// Point a job's parameters at a database
///
/// Index components the database cannot score are dropped.
pub fn apply_target_database(db: &BreedDatabase, master: &mut MasterParams, eco: &mut EcoParams) {
    master.target_database = db.name().to_string();
    eco.index_components = db.trait_keys(&eco.index_components);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use herdindex_core::domain::job::JobStatus;
    use herdindex_core::domain::traits::{Component, Trait, TraitWeight};
    use std::fs;

    pub(crate) const XREF: &str = r#"[
        {"name": "ID", "header": "ID", "select": true},
        {"name": "Name", "header": "Name", "select": true},
        {"name": "RegNo", "header": "Registration"},
        {"name": "WW,D", "header": "WW_Direct", "comment": "Weaning weight"},
        {"name": "MW,D", "header": "MW_Direct"},
        {"name": "CE,D", "header": "CED"},
        {"name": "Sire", "header": "SireName"}
    ]"#;

    /// Creates a database directory under `root` and returns a config for it
    pub(crate) fn write_database(root: &Path, name: &str, csv: &str) -> StoreConfig {
        let dir = root.join("epds").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README"), "Test population").unwrap();
        fs::write(dir.join("comp_fn_pairs.hjson"), XREF).unwrap();
        fs::write(dir.join("data.csv"), csv).unwrap();
        StoreConfig::new(root.join("users"), root.join("epds"))
    }

    pub(crate) fn job_with(output: Vec<TraitWeight>) -> Job {
        Job {
            owner: "alice".into(),
            name: "spring".into(),
            status: JobStatus::Passed,
            comment: String::new(),
            target_database: "Angus".into(),
            sale_endpoint: "weaning".into(),
            output,
            last_run: None,
        }
    }

    #[test]
    fn test_open_database() {
        let root = tempfile::tempdir().unwrap();
        let config = write_database(root.path(), "Angus", "ID,Name\n1,Bull1\n");

        let db = BreedDatabase::open(&config, "Angus").unwrap();
        assert_eq!(db.name(), "Angus");
        assert_eq!(db.description(), "Test population");
        assert!(db.data_file().ends_with("data.csv"));
        assert!(db.test().is_ok());

        let summary = db.summary();
        assert_eq!(summary.data_file, "data.csv");
        let keys: Vec<&str> = summary.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["ID", "Name", "RegNo", "WW,D", "MW,D", "CE,D", "Sire"]);
    }

    #[test]
    fn test_open_unknown_database() {
        let root = tempfile::tempdir().unwrap();
        let config = write_database(root.path(), "Angus", "ID\n");

        assert!(matches!(
            BreedDatabase::open(&config, "Hereford"),
            Err(StoreError::DatabaseNotFound(_))
        ));
        assert!(matches!(
            BreedDatabase::open(&config, "../epds"),
            Err(StoreError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_open_without_csv_is_integrity_error() {
        let root = tempfile::tempdir().unwrap();
        let config = write_database(root.path(), "Angus", "ID\n");
        fs::remove_file(root.path().join("epds/Angus/data.csv")).unwrap();

        assert!(matches!(
            BreedDatabase::open(&config, "Angus"),
            Err(StoreError::DatabaseIntegrity { .. })
        ));
        assert!(test_database(&config, "Angus").is_err());
    }

    #[test]
    fn test_health_check_sees_later_changes() {
        let root = tempfile::tempdir().unwrap();
        let config = write_database(root.path(), "Angus", "ID\n");
        let db = BreedDatabase::open(&config, "Angus").unwrap();

        fs::write(root.path().join("epds/Angus/second.csv"), "ID\n").unwrap();
        assert!(matches!(
            db.test(),
            Err(StoreError::DatabaseIntegrity { .. })
        ));
    }

    #[test]
    fn test_job_field_selection() {
        let root = tempfile::tempdir().unwrap();
        let config = write_database(root.path(), "Angus", "ID\n");
        let db = BreedDatabase::open(&config, "Angus").unwrap();

        let job = job_with(vec![
            TraitWeight::new(Trait::Ww, Component::Direct, 1.0),
            TraitWeight::new(Trait::Yw, Component::Direct, 1.0),
        ]);
        assert_eq!(db.default_columns(&job), vec!["ID", "Name", "WW,D"]);
    }

    #[test]
    fn test_apply_target_database() {
        let root = tempfile::tempdir().unwrap();
        let config = write_database(root.path(), "Angus", "ID\n");
        let db = BreedDatabase::open(&config, "Angus").unwrap();

        let mut master = MasterParams::default();
        let mut eco = EcoParams {
            index_components: vec!["BW,D".into(), "WW, D".into(), "CD,D".into()],
            ..EcoParams::default()
        };

        apply_target_database(&db, &mut master, &mut eco);
        assert_eq!(master.target_database, "Angus");
        assert_eq!(eco.index_components, vec!["WW,D", "CD,D"]);
        assert_eq!(list_databases(&config).unwrap(), vec!["Angus"]);
    }
}
