//! Error types for the record manager.

use node_record_core::{CoreError, NodeId, ValidationError};
use node_record_store::StoreError;
use thiserror::Error;

/// Errors that can occur during record manager operations.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Building, signing, or resolving a scheme failed.
    #[error("record error: {0}")]
    Core(#[from] CoreError),

    /// The stored record for this identity did not validate.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// An update would move the record to a different identity.
    #[error("update changes identity from {expected} to {actual}")]
    IdentityChanged { expected: NodeId, actual: NodeId },

    #[error("sequence number exhausted at {0}")]
    SequenceExhausted(u64),

    /// The consumer loop is gone; the update was not accepted.
    #[error("record manager stopped")]
    ManagerStopped,
}

/// Result type for record manager operations.
pub type Result<T> = std::result::Result<T, RecordError>;
