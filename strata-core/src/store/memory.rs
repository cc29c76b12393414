/*
    memory.rs - In-memory backend

    Backs tests and the developer harness. The record map is shared between
    the backend and every connection it opens, so a reopened store observes
    earlier writes. Open behavior can be held back or failed on purpose to
    exercise the pending queue.
*/

use crate::store::backend::{BackendError, BackendResult, NodeBackend, NodeConnection, NodeRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

type Records = Arc<RwLock<HashMap<String, NodeRecord>>>;

/// In-memory node backend (for testing).
pub struct MemoryBackend {
    records: Records,
    open_gate: Option<Arc<Notify>>,
    fail_open: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            records: Arc::new(RwLock::new(HashMap::new())),
            open_gate: None,
            fail_open: false,
        }
    }

    /// Hold every `open` until the returned gate is released.
    pub fn hold_open(&mut self) -> OpenGate {
        let notify = Arc::new(Notify::new());
        self.open_gate = Some(notify.clone());
        OpenGate { notify }
    }

    /// Make every `open` fail.
    pub fn fail_open(&mut self) {
        self.fail_open = true;
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases opens held back by [`MemoryBackend::hold_open`].
pub struct OpenGate {
    notify: Arc<Notify>,
}

impl OpenGate {
    pub fn release(&self) {
        // notify_one stores a permit, so releasing before the open task
        // reaches its await still lets it through.
        self.notify.notify_one();
    }
}

#[async_trait]
impl NodeBackend for MemoryBackend {
    type Connection = MemoryConnection;

    async fn open(&self, name: &str, _version: u32) -> BackendResult<MemoryConnection> {
        if let Some(gate) = &self.open_gate {
            gate.notified().await;
        }
        if self.fail_open {
            return Err(BackendError::Open(format!("refusing to open '{name}'")));
        }
        Ok(MemoryConnection {
            records: self.records.clone(),
        })
    }
}

/// Connection over the shared in-memory record map.
pub struct MemoryConnection {
    records: Records,
}

#[async_trait]
impl NodeConnection for MemoryConnection {
    async fn read(&self, path: &str) -> BackendResult<Option<NodeRecord>> {
        Ok(self.records.read().await.get(path).cloned())
    }

    async fn write(&self, record: NodeRecord) -> BackendResult<()> {
        self.records
            .write()
            .await
            .insert(record.path.clone(), record);
        Ok(())
    }

    async fn delete(&self, path: &str) -> BackendResult<()> {
        self.records.write().await.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::node::{Node, Payload};

    fn record(path: &str, text: &str) -> NodeRecord {
        NodeRecord::new(
            path,
            Node::new(Payload::Text(text.to_string()), "text/plain"),
        )
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let backend = MemoryBackend::new();
        let conn = backend.open("memory-tests", 1).await.unwrap();

        conn.write(record("/a", "one")).await.unwrap();
        let loaded = conn.read("/a").await.unwrap().unwrap();
        assert_eq!(loaded, record("/a", "one"));

        conn.delete("/a").await.unwrap();
        assert!(conn.read("/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopened_store_sees_earlier_writes() {
        let backend = MemoryBackend::new();
        let first = backend.open("memory-tests", 1).await.unwrap();
        first.write(record("/a", "one")).await.unwrap();

        let second = backend.open("memory-tests", 1).await.unwrap();
        assert!(second.read("/a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fail_open() {
        let mut backend = MemoryBackend::new();
        backend.fail_open();
        let result = backend.open("memory-tests", 1).await;
        assert!(matches!(result, Err(BackendError::Open(_))));
    }

    #[tokio::test]
    async fn test_held_open_completes_after_release() {
        let mut backend = MemoryBackend::new();
        let gate = backend.hold_open();
        gate.release();
        assert!(backend.open("memory-tests", 1).await.is_ok());
    }
}
