//! End-to-end behavior of the record manager over real stores.

use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;

use node_record::core::{
    decode_record, keys, CoreError, Ed25519Scheme, IdentityScheme, ValidationError,
};
use node_record::store::{MemoryStore, RecordStore, SqliteStore};
use node_record::{
    Endpoint, ManagerConfig, RecordError, RecordManager, SchemeRegistry, SignedRecord,
};
use node_record_testkit::{CountingStore, TestFixture};

type Store = Arc<CountingStore<MemoryStore>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn pair(key: &'static str, value: &'static str) -> (Bytes, Bytes) {
    (Bytes::from_static(key.as_bytes()), Bytes::from_static(value.as_bytes()))
}

fn no_pairs() -> Vec<(Bytes, Bytes)> {
    Vec::new()
}

fn value<'a>(record: &'a SignedRecord, key: &str) -> Option<&'a [u8]> {
    record.get(key.as_bytes()).map(|v| &v[..])
}

fn counting(records: impl IntoIterator<Item = SignedRecord>) -> Store {
    Arc::new(CountingStore::new(MemoryStore::with_records(records)))
}

async fn manager(store: Store, fixture: &TestFixture, initial: Vec<(Bytes, Bytes)>) -> Result<RecordManager<Store>> {
    Ok(RecordManager::new(
        store,
        fixture.private_key.clone(),
        initial,
        SchemeRegistry::default(),
        ManagerConfig::default(),
    )
    .await?)
}

#[tokio::test]
async fn fresh_store_creates_minimal_record() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let store = counting([]);

    let manager = manager(store.clone(), &fixture, no_pairs()).await?;
    let current = manager.current().clone();

    assert_eq!(current.seq(), 1);
    assert_eq!(current.len(), 2);
    assert_eq!(value(&current, "id"), Some(&b"v4"[..]));
    assert_eq!(value(&current, "secp256k1"), Some(fixture.public_key().as_slice()));
    assert_eq!(manager.node_id(), fixture.node_id());

    assert_eq!(manager.store().sets(), 1);
    assert_eq!(store.node_ids().await?, vec![fixture.node_id()]);
    assert_eq!(store.get(&fixture.node_id()).await?, current);
    Ok(())
}

#[tokio::test]
async fn stored_record_is_reconciled_with_caller_pairs() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let stored = fixture.make_record(5, [pair("ip", "\x7f\0\0\x01")]);
    let store = counting([stored.clone()]);

    let manager = manager(store.clone(), &fixture, vec![pair("foo", "bar")]).await?;
    let current = manager.current();

    assert_eq!(current.seq(), 6);
    assert_eq!(value(current, "foo"), Some(&b"bar"[..]));
    for (k, v) in stored.iter() {
        assert_eq!(current.get(k), Some(v));
    }
    assert_eq!(store.get(&fixture.node_id()).await?.seq(), 6);
    Ok(())
}

#[tokio::test]
async fn reconciliation_without_changes_keeps_history() -> Result<()> {
    let fixture = TestFixture::new();
    let stored = fixture.make_record(5, [pair("foo", "bar")]);
    let store = counting([stored.clone()]);

    let manager = manager(store.clone(), &fixture, vec![pair("foo", "bar")]).await?;

    assert_eq!(manager.current(), &stored);
    assert_eq!(store.sets(), 0);
    Ok(())
}

#[tokio::test]
async fn restart_does_not_reassert_scheme_defaults() -> Result<()> {
    let fixture = TestFixture::new();
    // A stored record at seq 5 without any caller pairs to replay.
    let stored = fixture.make_record(5, [pair("client", "old")]);
    let store = counting([stored.clone()]);

    let manager = manager(store.clone(), &fixture, no_pairs()).await?;

    assert_eq!(manager.current().seq(), 5);
    assert_eq!(store.sets(), 0);
    Ok(())
}

#[tokio::test]
async fn exhausted_sequence_fails_reconciliation() -> Result<()> {
    let fixture = TestFixture::new();
    let stored = fixture.make_record(u64::MAX, [pair("foo", "bar")]);
    let store = counting([stored.clone()]);

    let err = manager(store.clone(), &fixture, vec![pair("foo", "baz")])
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::SequenceExhausted(u64::MAX))
    ));
    assert_eq!(store.sets(), 0);
    assert_eq!(store.get(&fixture.node_id()).await?, stored);

    // Nothing to change, so the exhausted record is still usable.
    let manager = manager(store.clone(), &fixture, vec![pair("foo", "bar")]).await?;
    assert_eq!(manager.current(), &stored);
    Ok(())
}

#[tokio::test]
async fn forged_stored_record_is_rejected() {
    let fixture = TestFixture::new();
    let other = TestFixture::with_seed(7).make_record(3, no_pairs());
    let parts = decode_record(&other.to_bytes()).unwrap();
    let forged = SignedRecord::from_parts(fixture.node_id(), parts);

    let err = manager(counting([forged]), &fixture, no_pairs())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::Validation(ValidationError::NodeIdMismatch { .. }))
    ));
}

#[tokio::test]
async fn update_is_idempotent() -> Result<()> {
    let fixture = TestFixture::new();
    let store = counting([]);
    let mut manager = manager(store.clone(), &fixture, no_pairs()).await?;

    let first = manager.update([pair("foo", "bar")]).await?;
    assert_eq!(first.seq(), 2);
    assert_eq!(store.sets(), 2);

    let again = manager.update([pair("foo", "bar")]).await?;
    assert_eq!(again, first);
    assert_eq!(again.signature(), first.signature());
    assert_eq!(store.sets(), 2);

    // A subset of existing pairs is also a no-op.
    let scheme = manager.update([pair("id", "v4")]).await?;
    assert_eq!(scheme.seq(), 2);
    assert_eq!(store.sets(), 2);
    Ok(())
}

#[tokio::test]
async fn update_merges_pairs() -> Result<()> {
    let fixture = TestFixture::new();
    let mut manager = manager(counting([]), &fixture, no_pairs()).await?;

    let added = manager.update([pair("foo", "bar")]).await?;
    assert_eq!(added.len(), 3);
    assert_eq!(value(&added, "foo"), Some(&b"bar"[..]));

    let added = manager.update([pair("baz", "qux")]).await?;
    assert_eq!(added.len(), 4);

    let changed = manager.update([pair("foo", "other")]).await?;
    assert_eq!(changed.seq(), 4);
    assert_eq!(changed.len(), 4);
    assert_eq!(value(&changed, "foo"), Some(&b"other"[..]));
    assert_eq!(value(&changed, "baz"), Some(&b"qux"[..]));
    assert_eq!(value(&changed, "id"), Some(&b"v4"[..]));
    assert_eq!(changed.node_id(), fixture.node_id());
    Ok(())
}

#[tokio::test]
async fn update_publishes_to_handles() -> Result<()> {
    let fixture = TestFixture::new();
    let mut manager = manager(counting([]), &fixture, no_pairs()).await?;
    let handle = manager.handle();

    manager.update([pair("foo", "bar")]).await?;

    assert_eq!(handle.current().seq(), 2);
    assert_eq!(&handle.current(), manager.current());
    Ok(())
}

#[tokio::test]
async fn update_cannot_change_identity() -> Result<()> {
    let fixture = TestFixture::new();
    let registry = SchemeRegistry::default().with(Ed25519Scheme);
    let mut manager = RecordManager::new(
        counting([]),
        fixture.private_key.clone(),
        no_pairs(),
        registry,
        ManagerConfig::default(),
    )
    .await?;

    // Swapping the public key for another identity's fails to sign.
    let other = TestFixture::with_seed(9).public_key();
    let err = manager
        .update([(Bytes::from_static(keys::SECP256K1), Bytes::from(other))])
        .await
        .unwrap_err();
    assert!(matches!(err, RecordError::Core(CoreError::SigningFailure(_))));

    // Switching to another registered scheme would derive a new node id.
    let ed25519_key = Ed25519Scheme.public_key(&fixture.private_key)?;
    let err = manager
        .update([
            (Bytes::from_static(keys::ID), Bytes::from_static(Ed25519Scheme::NAME)),
            (Bytes::from_static(keys::ED25519), Bytes::from(ed25519_key)),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, RecordError::IdentityChanged { .. }));

    assert_eq!(manager.current().seq(), 1);
    assert_eq!(manager.node_id(), fixture.node_id());
    Ok(())
}

#[tokio::test]
async fn caller_scheme_suppresses_defaults() {
    let fixture = TestFixture::new();

    // Naming the scheme without its public key leaves nothing to sign with.
    let err = manager(counting([]), &fixture, vec![pair("id", "v4")])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RecordError>(),
        Some(RecordError::Core(CoreError::SigningFailure(_)))
    ));
}

#[tokio::test]
async fn unknown_scheme_fails_construction() {
    let fixture = TestFixture::new();
    let config = ManagerConfig {
        identity_scheme: Bytes::from_static(b"v5"),
    };

    let err = RecordManager::new(
        counting([]),
        fixture.private_key.clone(),
        no_pairs(),
        SchemeRegistry::default(),
        config,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RecordError::Core(CoreError::UnknownScheme(_))));
}

#[tokio::test]
async fn ed25519_scheme_by_config() -> Result<()> {
    let fixture = TestFixture::new();
    let config = ManagerConfig {
        identity_scheme: Bytes::from_static(Ed25519Scheme::NAME),
    };

    let manager = RecordManager::new(
        counting([]),
        fixture.private_key.clone(),
        no_pairs(),
        SchemeRegistry::default().with(Ed25519Scheme),
        config,
    )
    .await?;

    let public_key = Ed25519Scheme.public_key(&fixture.private_key)?;
    assert_eq!(value(manager.current(), "id"), Some(&b"ed25519"[..]));
    assert_eq!(value(manager.current(), "ed25519"), Some(public_key.as_slice()));
    assert_eq!(manager.node_id(), Ed25519Scheme.node_id(&public_key)?);
    Ok(())
}

#[tokio::test]
async fn queued_updates_keep_producer_order() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let store = counting([]);
    let manager = manager(store.clone(), &fixture, no_pairs()).await?;
    let node_id = manager.node_id();

    let (handle, task) = manager.spawn();
    let records = handle.subscribe();
    let producer_a = handle.clone();
    let producer_b = handle.clone();
    drop(handle);

    let (a, b) = tokio::join!(
        producer_a.enqueue_update([pair("k", "1"), pair("k", "2")]),
        producer_b.enqueue_update([pair("other", "x")]),
    );
    a?;
    b?;
    drop(producer_a);
    drop(producer_b);

    task.await??;

    let last = records.borrow().clone();
    assert_eq!(last.seq(), 4);
    assert_eq!(value(&last, "k"), Some(&b"2"[..]));
    assert_eq!(value(&last, "other"), Some(&b"x"[..]));
    assert_eq!(store.get(&node_id).await?, last);

    // Creation plus one write per applied pair, each one seq ahead.
    let writes = store.writes();
    let seqs: Vec<u64> = writes.iter().map(|r| r.seq()).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);

    let first_with = |v: &[u8]| writes.iter().position(|r| value(r, "k") == Some(v));
    let k1 = first_with(&b"1"[..]).expect("k=1 was written");
    let k2 = first_with(&b"2"[..]).expect("k=2 was written");
    assert!(k1 < k2, "k=1 applied at write {k1}, k=2 at write {k2}");
    // k=2 replaced k=1 in a single step, whatever ran in between.
    assert!(writes[k1..k2].iter().all(|r| value(r, "k") == Some(&b"1"[..])));
    Ok(())
}

#[tokio::test]
async fn endpoint_updates_land_in_record() -> Result<()> {
    let fixture = TestFixture::new();
    let manager = manager(counting([]), &fixture, no_pairs()).await?;
    let (handle, _task) = manager.spawn();
    let mut records = handle.subscribe();

    let endpoint = Endpoint::new([10, 0, 0, 1], 30303);
    handle.update_endpoint(endpoint).await?;

    let record = records.wait_for(|r| r.seq() == 3).await?.clone();
    assert_eq!(record.udp_endpoint(), Some(endpoint.into()));
    assert_eq!(handle.current(), record);
    Ok(())
}

#[tokio::test]
async fn enqueue_after_stop_fails() -> Result<()> {
    let fixture = TestFixture::new();
    let manager = manager(counting([]), &fixture, no_pairs()).await?;
    let (handle, task) = manager.spawn();

    task.abort();
    let _ = task.await;

    assert!(handle.is_stopped());
    let err = handle.enqueue_update([pair("foo", "bar")]).await.unwrap_err();
    assert!(matches!(err, RecordError::ManagerStopped));
    Ok(())
}

#[tokio::test]
async fn failed_update_stops_the_loop() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let store = counting([]);
    let manager = manager(store.clone(), &fixture, no_pairs()).await?;
    let (handle, task) = manager.spawn();

    store.fail_writes(true);
    // Accepted by the consumer even though applying it will fail.
    handle.enqueue_update([pair("foo", "bar")]).await?;

    let result = task.await?;
    assert!(matches!(result, Err(RecordError::Store(_))));

    let err = handle.enqueue_update([pair("baz", "qux")]).await.unwrap_err();
    assert!(matches!(err, RecordError::ManagerStopped));
    assert_eq!(handle.current().seq(), 1);
    Ok(())
}

#[tokio::test]
async fn sqlite_record_survives_restart() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("records.db");
    let fixture = TestFixture::new();

    let first = {
        let store = SqliteStore::open(&path)?;
        let mut manager = RecordManager::open(store, fixture.private_key.clone()).await?;
        manager.update([pair("foo", "bar")]).await?
    };
    assert_eq!(first.seq(), 2);

    let store = SqliteStore::open(&path)?;
    let manager = RecordManager::open(store, fixture.private_key.clone()).await?;

    assert_eq!(manager.current(), &first);
    assert_eq!(manager.node_id(), fixture.node_id());
    Ok(())
}
