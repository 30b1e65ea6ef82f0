//! # Node Record Core
//!
//! Pure primitives for signed node records: identity schemes, canonical
//! encoding, and record construction.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`UnsignedRecord`] - Sequence number plus sorted key/value pairs
//! - [`SignedRecord`] - A record with its signature and derived [`NodeId`]
//! - [`SchemeRegistry`] - Identity schemes keyed by name (`v4`, `ed25519`)
//! - [`PrivateKey`] - Caller-supplied key material
//!
//! ## Canonicalization
//!
//! Records are signed over RLP with keys in byte order. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod record;
pub mod types;
pub mod validation;

pub use canonical::{content_bytes, decode_record, record_bytes, RecordParts, MAX_RECORD_SIZE};
pub use crypto::{Ed25519Scheme, IdentityScheme, PrivateKey, SchemeRegistry, V4Scheme};
pub use error::{CoreError, ValidationError};
pub use record::{SignedRecord, UnsignedRecord};
pub use types::NodeId;
pub use validation::validate_record;
