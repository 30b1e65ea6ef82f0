//! The record manager: owner of the local node record.
//!
//! The manager holds the private key and the current signed record. Every
//! change goes through [`RecordManager::update`], which is the only path that
//! bumps the sequence number or signs. Other subsystems propose pairs through a
//! [`RecordHandle`]; a single consumer loop ([`RecordManager::run`]) applies
//! them one at a time, so concurrent producers never race on signing.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use node_record_core::{
    keys, validate_record, NodeId, PrivateKey, SchemeRegistry, SignedRecord, UnsignedRecord,
    V4Scheme,
};
use node_record_store::{RecordStore, StoreExt};

use crate::endpoint::Endpoint;
use crate::error::{RecordError, Result};

/// Configuration for the record manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Scheme injected under `id` when the initial pairs do not name one.
    pub identity_scheme: Bytes,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            identity_scheme: Bytes::from_static(V4Scheme::NAME),
        }
    }
}

/// A single pair in flight from a producer to the consumer loop.
#[derive(Debug)]
struct QueuedUpdate {
    key: Bytes,
    value: Bytes,
    /// Fired by the consumer as soon as it takes the pair off the queue.
    accepted: oneshot::Sender<()>,
}

/// The state only the consumer may touch.
struct RecordWriter<S> {
    store: S,
    private_key: PrivateKey,
    registry: SchemeRegistry,
    node_id: NodeId,
    current: SignedRecord,
    published: watch::Sender<SignedRecord>,
}

impl<S: RecordStore> RecordWriter<S> {
    async fn update(&mut self, pairs: Vec<(Bytes, Bytes)>) -> Result<SignedRecord> {
        let changed = self
            .current
            .differs_from(pairs.iter().map(|(k, v)| (&k[..], &v[..])));
        if !changed {
            debug!(node_id = %self.node_id, seq = self.current.seq(), "record unchanged");
            return Ok(self.current.clone());
        }

        let seq = self
            .current
            .seq()
            .checked_add(1)
            .ok_or(RecordError::SequenceExhausted(self.current.seq()))?;

        let record = self
            .current
            .to_unsigned()
            .with_seq(seq)
            .merge(pairs)
            .sign(&self.registry, &self.private_key)?;

        if record.node_id() != self.node_id {
            return Err(RecordError::IdentityChanged {
                expected: self.node_id,
                actual: record.node_id(),
            });
        }

        self.store.set(&record).await?;
        self.current = record.clone();
        self.published.send_replace(record.clone());

        info!(node_id = %self.node_id, seq, "record updated");
        Ok(record)
    }
}

/// Owns the local node record and serializes every change to it.
///
/// Construct with [`RecordManager::new`], hand out [`RecordHandle`]s to
/// producers, then drive the consumer loop with [`RecordManager::run`] or
/// [`RecordManager::spawn`].
pub struct RecordManager<S> {
    writer: RecordWriter<S>,
    handle: RecordHandle,
    inbox: mpsc::Receiver<QueuedUpdate>,
}

impl<S: RecordStore> RecordManager<S> {
    /// Create the manager for the identity of `private_key`.
    ///
    /// When `initial_pairs` do not name a scheme under `id`, the configured
    /// scheme and its public key are injected; caller pairs win on collision.
    /// The resulting seq 1 record fixes the identity. If the store has no
    /// record for it, that record is persisted. Otherwise the stored record is
    /// resumed and only the caller's pairs are applied on top of it.
    pub async fn new<K, V>(
        store: S,
        private_key: PrivateKey,
        initial_pairs: impl IntoIterator<Item = (K, V)>,
        registry: SchemeRegistry,
        config: ManagerConfig,
    ) -> Result<Self>
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        let initial: Vec<(Bytes, Bytes)> = initial_pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut minimal = UnsignedRecord::new(1, Vec::<(Bytes, Bytes)>::new());
        if !initial.iter().any(|(k, _)| &k[..] == keys::ID) {
            let scheme = registry.get(&config.identity_scheme)?;
            minimal = minimal
                .with_pair(keys::ID, config.identity_scheme.clone())
                .with_pair(scheme.public_key_key(), scheme.public_key(&private_key)?);
        }
        let minimal = minimal
            .merge(initial.iter().cloned())
            .sign(&registry, &private_key)?;
        let node_id = minimal.node_id();

        let (current, reconcile) = match store.get_optional(&node_id).await? {
            None => {
                store.set(&minimal).await?;
                info!(node_id = %node_id, seq = minimal.seq(), "created local node record");
                (minimal, false)
            }
            Some(stored) => {
                validate_record(&stored, &registry)?;
                debug!(node_id = %node_id, seq = stored.seq(), "resumed local node record");
                (stored, true)
            }
        };

        let (published, records) = watch::channel(current.clone());
        let (queue, inbox) = mpsc::channel(1);

        let mut manager = Self {
            writer: RecordWriter {
                store,
                private_key,
                registry,
                node_id,
                current,
                published,
            },
            handle: RecordHandle { queue, records },
            inbox,
        };

        if reconcile {
            manager.writer.update(initial).await?;
        }

        Ok(manager)
    }

    /// Create a manager with the default registry and config and no initial pairs.
    pub async fn open(store: S, private_key: PrivateKey) -> Result<Self> {
        Self::new(
            store,
            private_key,
            Vec::<(Bytes, Bytes)>::new(),
            SchemeRegistry::default(),
            ManagerConfig::default(),
        )
        .await
    }

    pub fn current(&self) -> &SignedRecord {
        &self.writer.current
    }

    /// The identity; fixed for the manager's lifetime.
    pub fn node_id(&self) -> NodeId {
        self.writer.node_id
    }

    pub fn store(&self) -> &S {
        &self.writer.store
    }

    /// Apply pairs to the current record.
    ///
    /// If every pair is already present with the same value the current record
    /// is returned as is: no signing, no store write, no sequence bump.
    /// Otherwise the pairs are merged over the current ones, the sequence
    /// number is incremented, and the signed result is written through to the
    /// store before it becomes current.
    pub async fn update<K, V>(
        &mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<SignedRecord>
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.writer.update(pairs).await
    }

    /// A producer handle for queued updates.
    pub fn handle(&self) -> RecordHandle {
        self.handle.clone()
    }

    /// Run the consumer loop.
    ///
    /// Applies queued pairs one at a time in arrival order. Returns `Ok` once
    /// every [`RecordHandle`] is dropped. The first failed update stops the
    /// loop and is returned; pairs still queued are dropped.
    pub async fn run(self) -> Result<()> {
        let Self {
            mut writer,
            handle,
            mut inbox,
        } = self;
        drop(handle);

        debug!(node_id = %writer.node_id, "record manager started");

        while let Some(QueuedUpdate {
            key,
            value,
            accepted,
        }) = inbox.recv().await
        {
            let _ = accepted.send(());

            if let Err(e) = writer.update(vec![(key, value)]).await {
                error!(node_id = %writer.node_id, error = %e, "queued update failed, stopping record manager");
                return Err(e);
            }
        }

        debug!(node_id = %writer.node_id, "record manager stopped, all producers closed");
        Ok(())
    }
}

impl<S: RecordStore + 'static> RecordManager<S> {
    /// Run the consumer loop on the tokio runtime.
    pub fn spawn(self) -> (RecordHandle, JoinHandle<Result<()>>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }
}

impl<S> std::fmt::Debug for RecordManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordManager")
            .field("node_id", &self.writer.node_id)
            .field("seq", &self.writer.current.seq())
            .finish_non_exhaustive()
    }
}

/// Producer side of the manager. Cheap to clone.
///
/// Handles never mutate the record themselves; they hand pairs to the
/// consumer loop and can observe the records it publishes.
#[derive(Debug, Clone)]
pub struct RecordHandle {
    queue: mpsc::Sender<QueuedUpdate>,
    records: watch::Receiver<SignedRecord>,
}

impl RecordHandle {
    /// Queue pairs for the consumer loop.
    ///
    /// Pairs are sent one at a time in order. Each send returns only after the
    /// consumer has taken the pair off the queue; it does not wait for the
    /// update to be applied. Fails with [`RecordError::ManagerStopped`] if the
    /// consumer is gone.
    pub async fn enqueue_update<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        let pairs: Vec<(Bytes, Bytes)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        for (key, value) in pairs {
            let (accepted, accepted_rx) = oneshot::channel();
            self.queue
                .send(QueuedUpdate {
                    key,
                    value,
                    accepted,
                })
                .await
                .map_err(|_| RecordError::ManagerStopped)?;
            accepted_rx.await.map_err(|_| RecordError::ManagerStopped)?;
        }

        Ok(())
    }

    /// Queue the pairs advertising an observed endpoint.
    pub async fn update_endpoint(&self, endpoint: Endpoint) -> Result<()> {
        self.enqueue_update(endpoint.to_pairs()).await
    }

    /// The most recently published record.
    pub fn current(&self) -> SignedRecord {
        self.records.borrow().clone()
    }

    /// Watch published records. The receiver sees every record the consumer
    /// applies, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<SignedRecord> {
        self.records.clone()
    }

    /// Whether the consumer loop is gone.
    pub fn is_stopped(&self) -> bool {
        self.queue.is_closed()
    }
}
