//! Error types for the herdindex store

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing jobs and databases
///
/// `Display` carries full detail for logs. Callers facing users should show
/// [`StoreError::public_message`] instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage roots are unusable
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Database metadata is missing or malformed
    #[error("Bad database '{database}': {reason}")]
    Config { database: String, reason: String },

    /// Database directory does not hold exactly one CSV file
    #[error("Database '{database}' integrity error: {reason}")]
    DatabaseIntegrity { database: String, reason: String },

    /// A value in a database file does not have the expected type
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// No database directory with this name
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Job directory or its parameter files are absent
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Another run holds the job's lock
    #[error("Job is already running: {0}")]
    JobBusy(String),

    /// Name is not a single safe path segment
    #[error("Invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// Filesystem failure, with the operation that hit it
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    /// Wraps an I/O error with operation context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a bad-database error
    pub fn config(database: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            database: database.into(),
            reason: reason.into(),
        }
    }

    /// Create an integrity error
    pub fn integrity(database: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DatabaseIntegrity {
            database: database.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound(_) | Self::DatabaseNotFound(_))
    }

    /// Check if the caller can fix this error by changing the request
    pub fn is_client_error(&self) -> bool {
        self.is_not_found() || matches!(self, Self::InvalidName { .. } | Self::JobBusy(_))
    }

    /// Generic message safe to show to users
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::DatabaseIntegrity { .. } => "bad database",
            Self::DataFormat(_) => "database contains malformed data",
            Self::DatabaseNotFound(_) => "unknown database",
            Self::JobNotFound(_) => "bad job name",
            Self::JobBusy(_) => "job is already running",
            Self::InvalidName { .. } => "invalid name",
            Self::InvalidConfig(_) | Self::Io { .. } | Self::Serialization(_) | Self::Csv(_) => {
                "internal error"
            }
        }
    }
}
