//! Error types for irra-db.

use std::path::PathBuf;
use thiserror::Error;

use crate::vector::IndexConflict;

/// Result type alias for irra-db operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A store file could not be read or written.
    #[error("Cannot access {path}: {message}")]
    Access { path: PathBuf, message: String },

    /// A store file exists but its contents are not valid.
    #[error("Malformed store file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// A vector does not have the index dimension.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No index exists and creation was not requested.
    #[error("No vector index at {path}")]
    IndexNotFound { path: PathBuf },

    /// The index on disk was built with different settings.
    #[error("Vector index at {path} cannot be reused: {conflict}")]
    Conflict {
        path: PathBuf,
        conflict: IndexConflict,
    },

    #[error("Unknown vector index backend '{0}'")]
    UnknownBackend(String),

    /// A lock guarding the in-memory index was poisoned.
    #[error("Vector index lock poisoned: {0}")]
    Poisoned(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    pub fn access(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Access {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }
}
