//! Error types for itemsync-core

use std::time::Duration;

use thiserror::Error;

/// Result type alias using itemsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in itemsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connectivity probe reported the remote as unreachable
    #[error("Remote store is not reachable")]
    Offline,

    /// Remote store connection could not be established
    #[error("Remote connection failed: {0}")]
    Connection(String),

    /// A remote operation exceeded its time budget
    #[error("Remote operation '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Keep-remote resolution found no remote row for the record
    #[error("Remote record no longer exists: {0}")]
    RemoteRecordGone(String),
}

impl Error {
    /// Whether this error came from an elapsed time budget
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
