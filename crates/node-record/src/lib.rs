//! # Node Record
//!
//! The local node record manager for a peer discovery protocol: one signed,
//! versioned record per identity, persisted on every change, with concurrent
//! update requests serialized into a single version history.
//!
//! ## Key Concepts
//!
//! - **Record**: Immutable. Never edited. A change is a new record with the
//!   next sequence number, signed by the identity's private key.
//! - **Identity**: Derived from the record's public key by its identity scheme.
//!   It never changes for the lifetime of a manager.
//! - **Idempotence**: Updating with pairs the record already holds does not
//!   sign, write, or bump the sequence number.
//! - **Queued updates**: Producers hand pairs to a single consumer loop, which
//!   applies them in arrival order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use node_record::{Endpoint, ManagerConfig, RecordManager};
//! use node_record::core::{PrivateKey, SchemeRegistry};
//! use node_record::store::SqliteStore;
//!
//! async fn example() {
//!     let private_key = PrivateKey::from_hex(
//!         "b71c71a67e1177ad4e901695e1b4b9ee17ae16c6668d313eac2f96dbcda3f291",
//!     )
//!     .unwrap();
//!
//!     // Open storage
//!     let store = SqliteStore::open("records.db").unwrap();
//!
//!     // Create or resume the local record
//!     let manager = RecordManager::new(
//!         store,
//!         private_key,
//!         [(&b"client"[..], &b"example"[..])],
//!         SchemeRegistry::default(),
//!         ManagerConfig::default(),
//!     )
//!     .await
//!     .unwrap();
//!
//!     // Run the consumer loop and propose an observed endpoint
//!     let (handle, _task) = manager.spawn();
//!     handle
//!         .update_endpoint(Endpoint::new([127, 0, 0, 1], 30303))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `node_record::core` - Core primitives (SignedRecord, NodeId, schemes)
//! - `node_record::store` - Storage abstraction and SQLite

pub mod endpoint;
pub mod error;
pub mod manager;

// Re-export component crates
pub use node_record_core as core;
pub use node_record_store as store;

// Re-export main types for convenience
pub use endpoint::Endpoint;
pub use error::{RecordError, Result};
pub use manager::{ManagerConfig, RecordHandle, RecordManager};

// Re-export commonly used core types
pub use node_record_core::{NodeId, PrivateKey, SchemeRegistry, SignedRecord, UnsignedRecord};
