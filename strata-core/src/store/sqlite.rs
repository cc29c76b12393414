/*
    sqlite.rs - SQLite-backed persistent store

    One connection per adapter instance, exclusively owned; every call runs
    on a blocking thread. The schema is a single `nodes` table keyed by
    path, provisioned on first open and tracked through `PRAGMA
    user_version`.
*/

use crate::store::backend::{BackendError, BackendResult, NodeBackend, NodeConnection, NodeRecord};
use crate::store::node::{Payload, Version};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Opens SQLite databases under a data directory, one file per store name.
pub struct SqliteBackend {
    data_dir: PathBuf,
}

impl SqliteBackend {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        SqliteBackend {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl NodeBackend for SqliteBackend {
    type Connection = SqliteConnection;

    async fn open(&self, name: &str, version: u32) -> BackendResult<SqliteConnection> {
        let data_dir = self.data_dir.clone();
        let db_path = self.data_dir.join(format!("{name}.db"));

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&data_dir).map_err(|e| {
                BackendError::Open(format!("cannot create {}: {e}", data_dir.display()))
            })?;
            let conn =
                Connection::open(&db_path).map_err(|e| BackendError::Open(e.to_string()))?;
            provision_schema(&conn, version)?;
            debug!(db = %db_path.display(), "opened sqlite store");
            Ok(SqliteConnection {
                conn: Arc::new(Mutex::new(conn)),
            })
        })
        .await
        .map_err(|e| BackendError::Open(format!("open task failed: {e}")))?
    }
}

/// Create the `nodes` table when the database is new or behind the
/// requested schema version.
fn provision_schema(conn: &Connection, version: u32) -> BackendResult<()> {
    let current: u32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| BackendError::Open(e.to_string()))?;
    if current < version {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nodes (
                 path      TEXT PRIMARY KEY,
                 mime_type TEXT,
                 version   TEXT,
                 payload   BLOB
             )",
        )
        .map_err(|e| BackendError::Open(e.to_string()))?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| BackendError::Open(e.to_string()))?;
    }
    Ok(())
}

/// The single, exclusively owned connection behind a local store adapter.
pub struct SqliteConnection {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConnection {
    fn storage_err(e: rusqlite::Error) -> BackendError {
        BackendError::Storage(e.to_string())
    }

    fn join_err(e: tokio::task::JoinError) -> BackendError {
        BackendError::Storage(format!("task join error: {e}"))
    }
}

#[async_trait]
impl NodeConnection for SqliteConnection {
    async fn read(&self, path: &str) -> BackendResult<Option<NodeRecord>> {
        let conn = self.conn.clone();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let tx = guard
                .transaction_with_behavior(TransactionBehavior::Deferred)
                .map_err(Self::storage_err)?;
            let row = tx
                .query_row(
                    "SELECT mime_type, version, payload FROM nodes WHERE path = ?1",
                    params![path],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<Vec<u8>>>(2)?,
                        ))
                    },
                )
                .optional()
                .map_err(Self::storage_err)?;
            tx.commit().map_err(Self::storage_err)?;

            match row {
                None => Ok(None),
                Some((mime_type, version, payload)) => {
                    let data = payload
                        .map(|bytes| serde_json::from_slice::<Payload>(&bytes))
                        .transpose()
                        .map_err(|e| BackendError::Serialization(e.to_string()))?;
                    Ok(Some(NodeRecord {
                        path,
                        data,
                        mime_type,
                        version: version.map(Version::new),
                    }))
                }
            }
        })
        .await
        .map_err(Self::join_err)?
    }

    async fn write(&self, record: NodeRecord) -> BackendResult<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let payload = record
                .data
                .as_ref()
                .map(|data| serde_json::to_vec(data))
                .transpose()
                .map_err(|e| BackendError::Serialization(e.to_string()))?;

            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let tx = guard
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(Self::storage_err)?;
            tx.execute(
                "INSERT INTO nodes (path, mime_type, version, payload)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(path) DO UPDATE SET
                     mime_type = excluded.mime_type,
                     version = excluded.version,
                     payload = excluded.payload",
                params![
                    record.path,
                    record.mime_type,
                    record.version.as_ref().map(Version::as_str),
                    payload,
                ],
            )
            .map_err(Self::storage_err)?;
            tx.commit().map_err(Self::storage_err)
        })
        .await
        .map_err(Self::join_err)?
    }

    async fn delete(&self, path: &str) -> BackendResult<()> {
        let conn = self.conn.clone();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let tx = guard
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(Self::storage_err)?;
            tx.execute("DELETE FROM nodes WHERE path = ?1", params![path])
                .map_err(Self::storage_err)?;
            tx.commit().map_err(Self::storage_err)
        })
        .await
        .map_err(Self::join_err)?
    }
}
