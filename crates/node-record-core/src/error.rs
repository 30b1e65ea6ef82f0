//! Error types for node record primitives.

use thiserror::Error;

use crate::types::NodeId;

/// Core errors that can occur while building, signing, or decoding records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The record names an identity scheme that is not registered.
    #[error("unknown identity scheme: {0}")]
    UnknownScheme(String),

    /// The record has no `id` key.
    #[error("record does not name an identity scheme")]
    MissingScheme,

    /// Key material is malformed or does not match the record.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Encoded record exceeds the maximum record size.
    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge { size: usize, max: usize },
}

/// Validation errors for records received from storage or peers.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid sequence number: {0}")]
    InvalidSequence(u64),

    #[error("node id mismatch: record carries {claimed}, public key derives {derived}")]
    NodeIdMismatch { claimed: NodeId, derived: NodeId },

    #[error("signature verification failed")]
    SignatureFailed,

    #[error("scheme error: {0}")]
    Scheme(CoreError),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureFailed
            }
            other => ValidationError::Scheme(other),
        }
    }
}
