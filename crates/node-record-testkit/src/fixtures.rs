//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use node_record_core::{
    keys, IdentityScheme, NodeId, PrivateKey, SchemeRegistry, SignedRecord, UnsignedRecord,
    V4Scheme,
};
use node_record_store::{RecordStore, StoreError};

/// A test fixture with a deterministic private key.
pub struct TestFixture {
    pub private_key: PrivateKey,
}

impl TestFixture {
    /// Create a new test fixture with a fixed private key.
    pub fn new() -> Self {
        Self::with_seed(0x42)
    }

    /// Create with a private key of 32 repeated `seed` bytes.
    ///
    /// `seed` must be non-zero to be a valid secp256k1 scalar.
    pub fn with_seed(seed: u8) -> Self {
        Self {
            private_key: PrivateKey::from_bytes([seed; 32]),
        }
    }

    /// The compressed v4 public key.
    pub fn public_key(&self) -> Vec<u8> {
        V4Scheme
            .public_key(&self.private_key)
            .expect("fixture key is a valid secp256k1 scalar")
    }

    /// The node id derived from the v4 public key.
    pub fn node_id(&self) -> NodeId {
        V4Scheme
            .node_id(&self.public_key())
            .expect("fixture public key is valid")
    }

    /// A v4 record at `seq` holding the scheme pairs plus `extra`.
    pub fn make_record<K, V>(&self, seq: u64, extra: impl IntoIterator<Item = (K, V)>) -> SignedRecord
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        UnsignedRecord::new(seq, [(keys::ID, b"v4".to_vec()), (keys::SECP256K1, self.public_key())])
            .merge(extra)
            .sign(&SchemeRegistry::default(), &self.private_key)
            .expect("fixture record signs")
    }

    /// The seq 1 record with only the scheme pairs.
    pub fn minimal_record(&self) -> SignedRecord {
        self.make_record(1, Vec::<(Bytes, Bytes)>::new())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures with distinct keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::with_seed(i as u8 + 1))
        .collect()
}

/// A store wrapper that logs writes and can be told to fail them.
#[derive(Debug, Default)]
pub struct CountingStore<S> {
    inner: S,
    writes: Mutex<Vec<SignedRecord>>,
    fail_writes: AtomicBool,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Number of successful `set` calls.
    pub fn sets(&self) -> usize {
        self.writes.lock().expect("write log poisoned").len()
    }

    /// Every successfully written record, in write order.
    pub fn writes(&self) -> Vec<SignedRecord> {
        self.writes.lock().expect("write log poisoned").clone()
    }

    /// Make every following `set` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for CountingStore<S> {
    async fn get(&self, node_id: &NodeId) -> node_record_store::Result<SignedRecord> {
        self.inner.get(node_id).await
    }

    async fn set(&self, record: &SignedRecord) -> node_record_store::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("injected write failure".into()));
        }
        self.inner.set(record).await?;
        self.writes
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(record.clone());
        Ok(())
    }

    async fn contains(&self, node_id: &NodeId) -> node_record_store::Result<bool> {
        self.inner.contains(node_id).await
    }

    async fn delete(&self, node_id: &NodeId) -> node_record_store::Result<bool> {
        self.inner.delete(node_id).await
    }

    async fn node_ids(&self) -> node_record_store::Result<Vec<NodeId>> {
        self.inner.node_ids().await
    }
}
