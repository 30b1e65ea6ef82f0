//! Error types for the store module.

use node_record_core::{CoreError, NodeId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record is stored for this node id.
    ///
    /// Expected on first start; callers branch on it rather than report it.
    #[error("record not found: {0}")]
    NotFound(NodeId),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored record could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] CoreError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A lock guarding the backend was poisoned.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
