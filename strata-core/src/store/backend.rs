/*
    backend.rs - Contract for the local persistent connection

    A backend opens a named, versioned connection; the connection exposes a
    keyed record store. Absence is surfaced as `None` here, never converted
    into the empty node; that conversion belongs to the adapter's public
    boundary.
*/

use crate::store::node::{Node, Payload, Version};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by a local persistence backend, propagated verbatim
/// through the store layer.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Opening the physical connection failed.
    #[error("failed to open store: {0}")]
    Open(String),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// A stored record: the node fields merged with the path that keys them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub path: String,
    pub data: Option<Payload>,
    pub mime_type: Option<String>,
    pub version: Option<Version>,
}

impl NodeRecord {
    pub fn new(path: impl Into<String>, node: Node) -> Self {
        NodeRecord {
            path: path.into(),
            data: node.data,
            mime_type: node.mime_type,
            version: node.version,
        }
    }

    pub fn into_node(self) -> Node {
        Node {
            data: self.data,
            mime_type: self.mime_type,
            version: self.version,
        }
    }
}

/// Opens physical connections by store name and schema version.
///
/// Exactly one connection is opened per adapter instance; connections are
/// never shared between adapters.
#[async_trait]
pub trait NodeBackend: Send + Sync + 'static {
    type Connection: NodeConnection;

    async fn open(&self, name: &str, version: u32) -> BackendResult<Self::Connection>;
}

/// One open connection holding a keyed record store.
///
/// Reads run under the backend's read-only transaction scope, mutations
/// under read-write; the scope is a locking hint, not a correctness
/// mechanism.
#[async_trait]
pub trait NodeConnection: Send + Sync + 'static {
    async fn read(&self, path: &str) -> BackendResult<Option<NodeRecord>>;
    async fn write(&self, record: NodeRecord) -> BackendResult<()>;
    async fn delete(&self, path: &str) -> BackendResult<()>;
}
