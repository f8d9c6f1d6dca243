//! Core error types for mindbell-core.
//!
//! Stale records and duplicate firings are recovered inside the scheduler and
//! never show up here. The only failure the scheduler itself propagates is a
//! [`SchedulingError`]; the rest of the hierarchy belongs to the storage and
//! configuration layers.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mindbell-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The wake service declined to schedule a wakeup
    #[error("Scheduling failed: {0}")]
    Scheduling(#[from] SchedulingError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a wake service refuses a schedule request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// Delay was negative or too large to represent
    #[error("Invalid delay: {delay_secs}s (must be zero or positive and in range)")]
    InvalidDelay { delay_secs: i64 },

    /// No free wakeup slots
    #[error("Wake service exhausted: {limit} wakeups already scheduled")]
    Exhausted { limit: usize },

    /// Backend storage refused the write
    #[error("Wake service backend failure: {0}")]
    Backend(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to determine the data directory
    #[error("Cannot determine data directory: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_error_converts_into_core_error() {
        let err: CoreError = SchedulingError::Exhausted { limit: 8 }.into();
        assert!(matches!(err, CoreError::Scheduling(SchedulingError::Exhausted { limit: 8 })));
        assert_eq!(
            err.to_string(),
            "Scheduling failed: Wake service exhausted: 8 wakeups already scheduled"
        );
    }

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let raw = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        let mapped: DatabaseError = raw.into();
        assert!(matches!(mapped, DatabaseError::Locked));
    }
}
