//! # Node Record Testkit
//!
//! Testing utilities for node records.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known records with expected outputs for cross-implementation verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use node_record_core::SchemeRegistry;
//! use node_record_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     let record = vector
//!         .unsigned()
//!         .sign(&SchemeRegistry::default(), &vector.private_key())
//!         .unwrap();
//!     assert_eq!(record.node_id().to_hex(), vector.expected_node_id);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use node_record_testkit::generators::{record_from_params, RecordParams};
//!
//! proptest! {
//!     #[test]
//!     fn signing_is_deterministic(params: RecordParams) {
//!         let r1 = record_from_params(&params);
//!         let r2 = record_from_params(&params);
//!         prop_assert_eq!(r1.signature(), r2.signature());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use node_record_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let record = fixture.make_record(3, [(&b"foo"[..], &b"bar"[..])]);
//! assert_eq!(record.node_id(), fixture.node_id());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, CountingStore, TestFixture};
pub use generators::{record_from_params, RecordParams};
pub use vectors::{all_vectors, GoldenVector, EIP778};
