//! # Node Record Store
//!
//! Storage abstraction for node records. Provides a trait-based interface
//! for record persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store abstracts record storage behind the [`RecordStore`] trait,
//! keeping the record manager storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`StoreError`] - `NotFound` drives first-start record creation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use node_record_store::{RecordStore, SqliteStore, StoreExt};
//! use node_record_core::NodeId;
//!
//! async fn example() {
//!     let store = SqliteStore::open("records.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let missing = store.get_optional(&NodeId::ZERO).await.unwrap();
//!     assert!(missing.is_none());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Latest record only**: one row per node id, replaced on every `set`
//! - **No policy**: sequence numbers and signatures are not checked here

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, StoreExt};
