//! In-memory implementation of the RecordStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use node_record_core::{NodeId, SignedRecord};

use crate::error::{Result, StoreError};
use crate::traits::RecordStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<NodeId, SignedRecord>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = SignedRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.node_id(), r)).collect()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, node_id: &NodeId) -> Result<SignedRecord> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        records
            .get(node_id)
            .cloned()
            .ok_or(StoreError::NotFound(*node_id))
    }

    async fn set(&self, record: &SignedRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(record.node_id(), record.clone());
        Ok(())
    }

    async fn contains(&self, node_id: &NodeId) -> Result<bool> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.contains_key(node_id))
    }

    async fn delete(&self, node_id: &NodeId) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        Ok(records.remove(node_id).is_some())
    }

    async fn node_ids(&self) -> Result<Vec<NodeId>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        let mut ids: Vec<NodeId> = records.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_record_core::{keys, IdentityScheme, PrivateKey, SchemeRegistry, UnsignedRecord, V4Scheme};

    fn make_test_record(seed: u8, seq: u64) -> SignedRecord {
        let key = PrivateKey::from_bytes([seed; 32]);
        let public_key = V4Scheme.public_key(&key).unwrap();
        UnsignedRecord::new(seq, [(keys::ID, b"v4".to_vec()), (keys::SECP256K1, public_key)])
            .sign(&SchemeRegistry::default(), &key)
            .unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let record = make_test_record(1, 1);

        store.set(&record).await.unwrap();

        let retrieved = store.get(&record.node_id()).await.unwrap();
        assert_eq!(retrieved, record);
        assert!(store.contains(&record.node_id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_not_found() {
        let store = MemoryStore::new();
        let err = store.get(&NodeId::ZERO).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_memory_store_overwrites_without_seq_check() {
        let store = MemoryStore::new();
        let newer = make_test_record(1, 5);
        let older = make_test_record(1, 2);

        store.set(&newer).await.unwrap();
        store.set(&older).await.unwrap();

        assert_eq!(store.get(&older.node_id()).await.unwrap().seq(), 2);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_delete_and_list() {
        let a = make_test_record(1, 1);
        let b = make_test_record(2, 1);
        let store = MemoryStore::with_records([a.clone(), b.clone()]);

        assert_eq!(store.node_ids().await.unwrap().len(), 2);
        assert!(store.delete(&a.node_id()).await.unwrap());
        assert!(!store.delete(&a.node_id()).await.unwrap());
        assert_eq!(store.node_ids().await.unwrap(), vec![b.node_id()]);
    }

    #[tokio::test]
    async fn test_memory_store_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryStore::new());
        assert!(store.is_empty().unwrap());

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(StoreError::Poisoned)));
        assert!(matches!(store.is_empty(), Err(StoreError::Poisoned)));
        let err = store.get(&NodeId::ZERO).await.unwrap_err();
        assert!(matches!(err, StoreError::Poisoned));
    }
}
