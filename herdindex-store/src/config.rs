//! Store configuration
//!
//! Defines where user job trees and breed databases live. Every path the
//! store touches is resolved through [`StoreConfig`], which also rejects
//! names that could escape their namespace.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Storage roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root holding `users/<user>/jobs/<job>/`
    pub users_root: PathBuf,

    /// Root holding one directory per breed database
    pub databases_root: PathBuf,
}

impl StoreConfig {
    pub fn new(users_root: impl Into<PathBuf>, databases_root: impl Into<PathBuf>) -> Self {
        Self {
            users_root: users_root.into(),
            databases_root: databases_root.into(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Optional environment variables:
    /// - HERDINDEX_USERS_ROOT (default: /tmp/herdindexDB)
    /// - HERDINDEX_DATABASES_ROOT (default: ./epds)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let users_root = std::env::var_os("HERDINDEX_USERS_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.users_root);

        let databases_root = std::env::var_os("HERDINDEX_DATABASES_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.databases_root);

        Self::new(users_root, databases_root)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.users_root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig("users_root cannot be empty".into()));
        }

        if self.databases_root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig(
                "databases_root cannot be empty".into(),
            ));
        }

        if self.users_root.exists() && !self.users_root.is_dir() {
            return Err(StoreError::InvalidConfig(format!(
                "users_root {} is not a directory",
                self.users_root.display()
            )));
        }

        if self.databases_root.exists() && !self.databases_root.is_dir() {
            return Err(StoreError::InvalidConfig(format!(
                "databases_root {} is not a directory",
                self.databases_root.display()
            )));
        }

        Ok(())
    }

    /// Directory holding every user namespace
    pub fn users_dir(&self) -> PathBuf {
        self.users_root.join("users")
    }

    /// Directory holding a user's jobs
    pub fn jobs_dir(&self, user: &str) -> Result<PathBuf> {
        validate_name("user", user)?;
        Ok(self.users_dir().join(user).join("jobs"))
    }

    /// Directory of one job
    pub fn job_dir(&self, user: &str, job: &str) -> Result<PathBuf> {
        validate_name("job", job)?;
        Ok(self.jobs_dir(user)?.join(job))
    }

    /// Directory of one breed database
    pub fn database_dir(&self, name: &str) -> Result<PathBuf> {
        validate_name("database", name)?;
        Ok(self.databases_root.join(name))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("/tmp/herdindexDB", "./epds")
    }
}

/// Checks that a user, job or database name is a single safe path segment
///
/// Accepted names are non-empty and made of ASCII letters, digits, `_` and `-`.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.users_root, PathBuf::from("/tmp/herdindexDB"));
        assert_eq!(config.databases_root, PathBuf::from("./epds"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::new("/tmp/a", "/tmp/b");
        assert!(config.validate().is_ok());

        config.users_root = PathBuf::new();
        assert!(config.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();
        let config = StoreConfig::new(dir.path(), &file);
        assert!(matches!(config.validate(), Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_job_layout() {
        let config = StoreConfig::new("/data", "/epds");
        assert_eq!(
            config.job_dir("alice", "spring-2024").unwrap(),
            PathBuf::from("/data/users/alice/jobs/spring-2024")
        );
        assert_eq!(
            config.database_dir("Angus").unwrap(),
            PathBuf::from("/epds/Angus")
        );
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let config = StoreConfig::default();
        for name in ["", ".", "..", "a/b", "a b", "../etc", "job.json"] {
            assert!(
                matches!(config.job_dir("alice", name), Err(StoreError::InvalidName { .. })),
                "accepted {name:?}"
            );
        }
        assert!(config.jobs_dir("../root").is_err());
        assert!(config.database_dir("Angus/..").is_err());
    }
}
