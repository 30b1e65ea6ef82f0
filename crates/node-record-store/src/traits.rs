//! Store trait: the abstract interface for record persistence.
//!
//! This trait allows the manager to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use node_record_core::{NodeId, SignedRecord};

use crate::error::{Result, StoreError};

/// The RecordStore trait: async interface for record persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **One record per node id**: the store keeps the most recently `set`
///   record for each identity.
/// - **Unconditional overwrite**: `set` does not compare sequence numbers or
///   check signatures. The record manager owns monotonicity for its identity.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get the record stored for `node_id`.
    ///
    /// Returns [`StoreError::NotFound`] when nothing is stored.
    async fn get(&self, node_id: &NodeId) -> Result<SignedRecord>;

    /// Store a record under its node id, replacing any previous record.
    async fn set(&self, record: &SignedRecord) -> Result<()>;

    /// Check if a record is stored for `node_id`.
    async fn contains(&self, node_id: &NodeId) -> Result<bool>;

    /// Remove the record for `node_id`. Returns whether one was removed.
    async fn delete(&self, node_id: &NodeId) -> Result<bool>;

    /// All node ids with a stored record.
    async fn node_ids(&self) -> Result<Vec<NodeId>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: RecordStore {
    /// Like [`RecordStore::get`], mapping `NotFound` to `None`.
    fn get_optional(
        &self,
        node_id: &NodeId,
    ) -> impl std::future::Future<Output = Result<Option<SignedRecord>>> + Send;
}

impl<S: RecordStore + ?Sized> StoreExt for S {
    async fn get_optional(&self, node_id: &NodeId) -> Result<Option<SignedRecord>> {
        match self.get(node_id).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn get(&self, node_id: &NodeId) -> Result<SignedRecord> {
        (**self).get(node_id).await
    }

    async fn set(&self, record: &SignedRecord) -> Result<()> {
        (**self).set(record).await
    }

    async fn contains(&self, node_id: &NodeId) -> Result<bool> {
        (**self).contains(node_id).await
    }

    async fn delete(&self, node_id: &NodeId) -> Result<bool> {
        (**self).delete(node_id).await
    }

    async fn node_ids(&self) -> Result<Vec<NodeId>> {
        (**self).node_ids().await
    }
}
