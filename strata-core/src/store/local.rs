/*
    local.rs - Local store adapter

    Owns exactly one backend connection for its lifetime. The connection is
    opened asynchronously at construction; until it is up, every call lands
    in the pending queue and is replayed in issue order once the open
    completes. Readiness is an explicit gate selected per call, never a
    rewrite of the adapter's own methods.

    If the open fails, every buffered call is rejected with the backend's
    error and the adapter stays failed; callers are never left awaiting a
    future that cannot settle.
*/

use crate::store::backend::{BackendError, NodeBackend, NodeConnection};
use crate::store::errors::{StoreError, StoreResult};
use crate::store::events::{ChangeEvent, ChangeOrigin, Listeners};
use crate::store::node::Node;
use crate::store::pending::{PendingCall, PendingQueue};
use crate::store::transaction::TransactionAdapter;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error};

/// Store name used when the caller does not pick one.
pub const DEFAULT_STORE_NAME: &str = "strata";

/// Schema version requested from the backend on open.
const SCHEMA_VERSION: u32 = 1;

enum Gate<C: NodeConnection> {
    /// The physical connection is still opening; calls are buffered.
    Opening(PendingQueue),
    /// The connection is up; calls go straight through.
    Ready(Arc<TransactionAdapter<C>>),
    /// The open failed; every call is rejected.
    Failed(BackendError),
}

/// Local store adapter over a persistent keyed record backend.
///
/// Must be constructed inside a tokio runtime; the open runs on a spawned
/// task.
pub struct LocalStore<B: NodeBackend> {
    gate: Arc<Mutex<Gate<B::Connection>>>,
    changes: Arc<Listeners<ChangeEvent>>,
}

impl<B: NodeBackend> LocalStore<B> {
    /// Create the adapter and begin opening the backing connection under
    /// `name`.
    pub fn open(backend: B, name: impl Into<String>) -> Self {
        let name = name.into();
        let changes = Arc::new(Listeners::new());
        let gate = Arc::new(Mutex::new(Gate::Opening(PendingQueue::new())));

        let task_gate = gate.clone();
        let task_changes = changes.clone();
        tokio::spawn(async move {
            let result = backend.open(&name, SCHEMA_VERSION).await;

            // The gate stays locked through the drain so calls arriving
            // mid-flush cannot overtake the buffered ones.
            let mut gate = task_gate.lock().await;
            let queue = match std::mem::replace(&mut *gate, Gate::Opening(PendingQueue::new())) {
                Gate::Opening(queue) => queue,
                other => {
                    *gate = other;
                    return;
                }
            };
            match result {
                Ok(conn) => {
                    debug!(store = %name, queued = queue.len(), "store connection opened");
                    let adapter = Arc::new(TransactionAdapter::new(conn, task_changes));
                    queue.flush(&adapter).await;
                    *gate = Gate::Ready(adapter);
                }
                Err(err) => {
                    error!(store = %name, error = %err, "failed to open store connection");
                    queue.reject_all(&err);
                    *gate = Gate::Failed(err);
                }
            }
        });

        LocalStore { gate, changes }
    }

    /// Subscribe to change notifications for every successful mutation on
    /// this adapter.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.changes.subscribe(callback);
    }

    /// Read the node at `path`; an absent record resolves to the canonical
    /// empty node.
    pub async fn get(&self, path: &str) -> StoreResult<Node> {
        let mut gate = self.gate.lock().await;
        match &mut *gate {
            Gate::Opening(queue) => {
                let (reply, receiver) = oneshot::channel();
                queue.push(PendingCall::Get {
                    path: path.to_string(),
                    reply,
                });
                drop(gate);
                await_reply(receiver).await
            }
            Gate::Ready(adapter) => {
                let adapter = adapter.clone();
                drop(gate);
                Ok(adapter.get(path).await?.unwrap_or_else(Node::empty))
            }
            Gate::Failed(err) => Err(StoreError::Backend(err.clone())),
        }
    }

    /// Write `node` at `path`. No version precondition is applied; the
    /// local store is an unconditionally-authoritative cache.
    pub async fn set(&self, path: &str, node: Node) -> StoreResult<()> {
        self.dispatch_set(path, node, ChangeOrigin::Local).await
    }

    /// Delete the record at `path`.
    pub async fn remove(&self, path: &str) -> StoreResult<()> {
        self.dispatch_remove(path, ChangeOrigin::Local).await
    }

    /// Apply a remote-sourced value at `path`: `Some` writes, `None`
    /// removes. Change notifications from this entry point carry
    /// [`ChangeOrigin::Remote`]; it exists for the reconciler that merges
    /// remote state into this store.
    pub async fn apply_remote(&self, path: &str, node: Option<Node>) -> StoreResult<()> {
        match node {
            Some(node) => self.dispatch_set(path, node, ChangeOrigin::Remote).await,
            None => self.dispatch_remove(path, ChangeOrigin::Remote).await,
        }
    }

    async fn dispatch_set(
        &self,
        path: &str,
        node: Node,
        origin: ChangeOrigin,
    ) -> StoreResult<()> {
        let mut gate = self.gate.lock().await;
        match &mut *gate {
            Gate::Opening(queue) => {
                let (reply, receiver) = oneshot::channel();
                queue.push(PendingCall::Set {
                    path: path.to_string(),
                    node,
                    origin,
                    reply,
                });
                drop(gate);
                await_reply(receiver).await
            }
            Gate::Ready(adapter) => {
                let adapter = adapter.clone();
                drop(gate);
                adapter.set(path, node, origin).await
            }
            Gate::Failed(err) => Err(StoreError::Backend(err.clone())),
        }
    }

    async fn dispatch_remove(&self, path: &str, origin: ChangeOrigin) -> StoreResult<()> {
        let mut gate = self.gate.lock().await;
        match &mut *gate {
            Gate::Opening(queue) => {
                let (reply, receiver) = oneshot::channel();
                queue.push(PendingCall::Remove {
                    path: path.to_string(),
                    origin,
                    reply,
                });
                drop(gate);
                await_reply(receiver).await
            }
            Gate::Ready(adapter) => {
                let adapter = adapter.clone();
                drop(gate);
                adapter.remove(path, origin).await
            }
            Gate::Failed(err) => Err(StoreError::Backend(err.clone())),
        }
    }
}

async fn await_reply<T>(receiver: oneshot::Receiver<StoreResult<T>>) -> StoreResult<T> {
    receiver.await.unwrap_or_else(|_| {
        Err(StoreError::Backend(BackendError::Storage(
            "pending call dropped before replay".to_string(),
        )))
    })
}
