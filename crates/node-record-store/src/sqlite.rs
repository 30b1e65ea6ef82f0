//! SQLite implementation of the RecordStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking. Records are stored as their
//! canonical RLP bytes keyed by node id.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use node_record_core::{decode_record, NodeId, SignedRecord};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::RecordStore;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await?
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn row_to_node_id(bytes: Vec<u8>) -> Result<NodeId> {
    NodeId::try_from(bytes.as_slice())
        .map_err(|_| StoreError::InvalidData(format!("node id has {} bytes", bytes.len())))
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, node_id: &NodeId) -> Result<SignedRecord> {
        let node_id = *node_id;

        self.with_conn(move |conn| {
            let encoded: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM node_records WHERE node_id = ?1",
                    params![node_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            let encoded = encoded.ok_or(StoreError::NotFound(node_id))?;
            let parts = decode_record(&encoded)?;
            Ok(SignedRecord::from_parts(node_id, parts))
        })
        .await
    }

    async fn set(&self, record: &SignedRecord) -> Result<()> {
        let node_id = record.node_id();
        let encoded = record.to_bytes();

        // seq is a u64 and lives only inside the encoded record; SQLite
        // integers are signed.
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO node_records (node_id, record, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(node_id) DO UPDATE SET
                    record = excluded.record,
                    updated_at = excluded.updated_at",
                params![node_id.as_bytes().as_slice(), encoded, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn contains(&self, node_id: &NodeId) -> Result<bool> {
        let node_id = *node_id;

        self.with_conn(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM node_records WHERE node_id = ?1",
                    params![node_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(exists.is_some())
        })
        .await
    }

    async fn delete(&self, node_id: &NodeId) -> Result<bool> {
        let node_id = *node_id;

        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM node_records WHERE node_id = ?1",
                params![node_id.as_bytes().as_slice()],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn node_ids(&self) -> Result<Vec<NodeId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT node_id FROM node_records ORDER BY node_id")?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

            let mut ids = Vec::new();
            for row in rows {
                ids.push(row_to_node_id(row?)?);
            }
            Ok(ids)
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
