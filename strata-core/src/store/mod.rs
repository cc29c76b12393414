/*
    store - Uniform storage-adapter layer

    CRUD over a hierarchical key space against interchangeable backing
    stores. Two adapters share one capability surface: a remote store
    speaking HTTP through a pluggable transport, and a local store over a
    persistent keyed record backend that buffers calls until its physical
    connection is ready.
*/

pub mod backend;
pub mod errors;
pub mod events;
pub mod http;
pub mod local;
pub mod memory;
pub mod node;
mod pending;
pub mod remote;
pub mod sqlite;
mod transaction;

pub use backend::{BackendError, BackendResult, NodeBackend, NodeConnection, NodeRecord};
pub use errors::{StoreError, StoreResult};
pub use events::{ChangeEvent, ChangeOrigin, Listeners};
pub use http::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError, TransportResult};
pub use local::{LocalStore, DEFAULT_STORE_NAME};
pub use memory::{MemoryBackend, MemoryConnection, OpenGate};
pub use node::{Node, Payload, Version};
pub use remote::{ConnectionState, RemoteOptions, RemoteStore, StorageInfo};
pub use sqlite::{SqliteBackend, SqliteConnection};

use async_trait::async_trait;

/// The capability surface shared by every store adapter, letting callers
/// and reconcilers stay agnostic of the backing transport.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the node at `path`. An absent target resolves to the canonical
    /// empty node, never an error.
    async fn get(&self, path: &str) -> StoreResult<Node>;

    /// Write `node` at `path`.
    async fn set(&self, path: &str, node: Node) -> StoreResult<()>;

    /// Delete the node at `path`.
    async fn remove(&self, path: &str) -> StoreResult<()>;
}

#[async_trait]
impl<B: NodeBackend> Store for LocalStore<B> {
    async fn get(&self, path: &str) -> StoreResult<Node> {
        LocalStore::get(self, path).await
    }

    async fn set(&self, path: &str, node: Node) -> StoreResult<()> {
        LocalStore::set(self, path, node).await
    }

    async fn remove(&self, path: &str) -> StoreResult<()> {
        LocalStore::remove(self, path).await
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn get(&self, path: &str) -> StoreResult<Node> {
        RemoteStore::get(self, path).await
    }

    async fn set(&self, path: &str, node: Node) -> StoreResult<()> {
        RemoteStore::set(self, path, node).await
    }

    async fn remove(&self, path: &str) -> StoreResult<()> {
        RemoteStore::remove(self, path).await
    }
}
