//! Record validation: signature verification and structural checks.

use crate::crypto::SchemeRegistry;
use crate::error::{CoreError, ValidationError};
use crate::record::SignedRecord;

/// Validate a signed record against the registry.
///
/// This performs:
/// - Sequence number check (records start at 1)
/// - Scheme lookup
/// - Node id derivation check
/// - Signature verification
pub fn validate_record(
    record: &SignedRecord,
    registry: &SchemeRegistry,
) -> Result<(), ValidationError> {
    // 1. Sequence numbers start at 1
    if record.seq() == 0 {
        return Err(ValidationError::InvalidSequence(0));
    }

    // 2. Resolve the scheme
    let scheme_name = record.scheme_name().ok_or(CoreError::MissingScheme)?;
    let scheme = registry.get(scheme_name)?;
    let public_key = record
        .get(scheme.public_key_key())
        .ok_or(CoreError::InvalidPublicKey)?;

    // 3. The node id must be the one the public key derives
    let derived = scheme.node_id(public_key)?;
    if derived != record.node_id() {
        return Err(ValidationError::NodeIdMismatch {
            claimed: record.node_id(),
            derived,
        });
    }

    // 4. Verify signature
    scheme
        .verify(&record.content_bytes(), record.signature(), public_key)
        .map_err(|_| ValidationError::SignatureFailed)?;

    Ok(())
}
