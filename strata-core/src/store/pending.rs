/*
    pending.rs - Buffers calls issued before the backing store is ready

    Every call made while the physical connection is still opening is
    recorded together with the reply channel of the future the caller is
    already awaiting. Once the connection is up the queue is flushed in
    issue order. Flushing consumes the queue, so a second flush is
    unrepresentable.
*/

use crate::store::backend::{BackendError, NodeConnection};
use crate::store::errors::{StoreError, StoreResult};
use crate::store::events::ChangeOrigin;
use crate::store::node::Node;
use crate::store::transaction::TransactionAdapter;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// One buffered operation: the call and the caller's reply channel.
pub(crate) enum PendingCall {
    Get {
        path: String,
        reply: oneshot::Sender<StoreResult<Node>>,
    },
    Set {
        path: String,
        node: Node,
        origin: ChangeOrigin,
        reply: oneshot::Sender<StoreResult<()>>,
    },
    Remove {
        path: String,
        origin: ChangeOrigin,
        reply: oneshot::Sender<StoreResult<()>>,
    },
}

/// FIFO buffer of calls awaiting the real adapter.
pub(crate) struct PendingQueue {
    calls: VecDeque<PendingCall>,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        PendingQueue {
            calls: VecDeque::new(),
        }
    }

    pub(crate) fn push(&mut self, call: PendingCall) {
        self.calls.push_back(call);
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }

    /// Replay every buffered call against the real adapter, in issue order.
    ///
    /// Each call is awaited before the next one starts, so the backend
    /// observes exactly the order the caller issued.
    pub(crate) async fn flush<C: NodeConnection>(self, adapter: &TransactionAdapter<C>) {
        for call in self.calls {
            match call {
                PendingCall::Get { path, reply } => {
                    let result = adapter
                        .get(&path)
                        .await
                        .map(|found| found.unwrap_or_else(Node::empty));
                    let _ = reply.send(result);
                }
                PendingCall::Set {
                    path,
                    node,
                    origin,
                    reply,
                } => {
                    let _ = reply.send(adapter.set(&path, node, origin).await);
                }
                PendingCall::Remove {
                    path,
                    origin,
                    reply,
                } => {
                    let _ = reply.send(adapter.remove(&path, origin).await);
                }
            }
        }
    }

    /// Settle every buffered call with the given backend failure.
    pub(crate) fn reject_all(self, error: &BackendError) {
        for call in self.calls {
            match call {
                PendingCall::Get { reply, .. } => {
                    let _ = reply.send(Err(StoreError::Backend(error.clone())));
                }
                PendingCall::Set { reply, .. } => {
                    let _ = reply.send(Err(StoreError::Backend(error.clone())));
                }
                PendingCall::Remove { reply, .. } => {
                    let _ = reply.send(Err(StoreError::Backend(error.clone())));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::NodeBackend;
    use crate::store::events::Listeners;
    use crate::store::memory::MemoryBackend;
    use crate::store::node::Payload;
    use std::sync::Arc;

    async fn adapter() -> TransactionAdapter<<MemoryBackend as NodeBackend>::Connection> {
        let backend = MemoryBackend::new();
        let conn = backend.open("pending-tests", 1).await.unwrap();
        TransactionAdapter::new(conn, Arc::new(Listeners::new()))
    }

    fn text_node(text: &str) -> Node {
        Node::new(Payload::Text(text.to_string()), "text/plain")
    }

    #[tokio::test]
    async fn test_flush_replays_in_issue_order() {
        let adapter = adapter().await;
        let mut queue = PendingQueue::new();

        let (set_reply, set_rx) = oneshot::channel();
        queue.push(PendingCall::Set {
            path: "/a".to_string(),
            node: text_node("one"),
            origin: ChangeOrigin::Local,
            reply: set_reply,
        });
        let (remove_reply, remove_rx) = oneshot::channel();
        queue.push(PendingCall::Remove {
            path: "/a".to_string(),
            origin: ChangeOrigin::Local,
            reply: remove_reply,
        });
        let (get_reply, get_rx) = oneshot::channel();
        queue.push(PendingCall::Get {
            path: "/a".to_string(),
            reply: get_reply,
        });

        queue.flush(&adapter).await;

        set_rx.await.unwrap().unwrap();
        remove_rx.await.unwrap().unwrap();
        // The remove was applied after the set, so the final read is empty.
        let node = get_rx.await.unwrap().unwrap();
        assert_eq!(node, Node::empty());
    }

    #[tokio::test]
    async fn test_get_of_missing_path_resolves_empty_node() {
        let adapter = adapter().await;
        let mut queue = PendingQueue::new();
        let (reply, rx) = oneshot::channel();
        queue.push(PendingCall::Get {
            path: "/nothing".to_string(),
            reply,
        });

        queue.flush(&adapter).await;
        assert_eq!(rx.await.unwrap().unwrap(), Node::empty());
    }

    #[tokio::test]
    async fn test_reject_all_settles_every_call() {
        let mut queue = PendingQueue::new();
        let (get_reply, get_rx) = oneshot::channel();
        queue.push(PendingCall::Get {
            path: "/a".to_string(),
            reply: get_reply,
        });
        let (set_reply, set_rx) = oneshot::channel();
        queue.push(PendingCall::Set {
            path: "/b".to_string(),
            node: text_node("x"),
            origin: ChangeOrigin::Local,
            reply: set_reply,
        });

        queue.reject_all(&BackendError::Open("refused".to_string()));

        assert!(matches!(
            get_rx.await.unwrap(),
            Err(StoreError::Backend(BackendError::Open(_)))
        ));
        assert!(matches!(
            set_rx.await.unwrap(),
            Err(StoreError::Backend(BackendError::Open(_)))
        ));
    }
}
