/*
    transaction.rs - Settle-once bridge between a connection and the store

    Wraps the raw backend operations into the adapter's uniform contract:
    one request, one settlement, no retries, no reinterpretation. Mutations
    additionally read the previous record so the change notification can
    carry both sides of the transition, tagged with its origin.
*/

use crate::store::backend::{NodeConnection, NodeRecord};
use crate::store::errors::StoreResult;
use crate::store::events::{ChangeEvent, ChangeOrigin, Listeners};
use crate::store::node::Node;
use std::sync::Arc;
use tracing::trace;

pub(crate) struct TransactionAdapter<C: NodeConnection> {
    conn: Arc<C>,
    changes: Arc<Listeners<ChangeEvent>>,
}

impl<C: NodeConnection> TransactionAdapter<C> {
    pub(crate) fn new(conn: C, changes: Arc<Listeners<ChangeEvent>>) -> Self {
        TransactionAdapter {
            conn: Arc::new(conn),
            changes,
        }
    }

    /// Read the record at `path`. Absence is surfaced as `None`; converting
    /// it into the canonical empty node is the caller's concern.
    pub(crate) async fn get(&self, path: &str) -> StoreResult<Option<Node>> {
        trace!(path, "store get");
        let record = self.conn.read(path).await?;
        Ok(record.map(NodeRecord::into_node))
    }

    pub(crate) async fn set(
        &self,
        path: &str,
        node: Node,
        origin: ChangeOrigin,
    ) -> StoreResult<()> {
        trace!(path, "store set");
        let old = self.conn.read(path).await?;
        self.conn.write(NodeRecord::new(path, node.clone())).await?;
        self.changes.emit(&ChangeEvent {
            path: path.to_string(),
            old_value: old.map(NodeRecord::into_node),
            new_value: Some(node),
            origin,
        });
        Ok(())
    }

    pub(crate) async fn remove(&self, path: &str, origin: ChangeOrigin) -> StoreResult<()> {
        trace!(path, "store remove");
        let old = self.conn.read(path).await?;
        self.conn.delete(path).await?;
        self.changes.emit(&ChangeEvent {
            path: path.to_string(),
            old_value: old.map(NodeRecord::into_node),
            new_value: None,
            origin,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::{NodeBackend, NodeConnection};
    use crate::store::memory::MemoryBackend;
    use crate::store::node::Payload;
    use std::sync::Mutex;

    fn text_node(text: &str) -> Node {
        Node::new(Payload::Text(text.to_string()), "text/plain")
    }

    async fn adapter_with_events() -> (
        TransactionAdapter<<MemoryBackend as NodeBackend>::Connection>,
        Arc<Mutex<Vec<ChangeEvent>>>,
    ) {
        let backend = MemoryBackend::new();
        let conn = backend.open("transaction-tests", 1).await.unwrap();
        let changes = Arc::new(Listeners::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        changes.subscribe(move |event: &ChangeEvent| sink.lock().unwrap().push(event.clone()));
        (TransactionAdapter::new(conn, changes), events)
    }

    #[tokio::test]
    async fn test_get_surfaces_absence_as_none() {
        let (adapter, _) = adapter_with_events().await;
        assert_eq!(adapter.get("/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_emits_change_with_old_and_new() {
        let (adapter, events) = adapter_with_events().await;

        adapter
            .set("/a", text_node("one"), ChangeOrigin::Local)
            .await
            .unwrap();
        adapter
            .set("/a", text_node("two"), ChangeOrigin::Remote)
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].path, "/a");
        assert!(events[0].old_value.is_none());
        assert_eq!(events[0].new_value, Some(text_node("one")));
        assert_eq!(events[0].origin, ChangeOrigin::Local);
        assert_eq!(events[1].old_value, Some(text_node("one")));
        assert_eq!(events[1].origin, ChangeOrigin::Remote);
    }

    #[tokio::test]
    async fn test_remove_emits_change_without_new_value() {
        let (adapter, events) = adapter_with_events().await;

        adapter
            .set("/a", text_node("one"), ChangeOrigin::Local)
            .await
            .unwrap();
        adapter.remove("/a", ChangeOrigin::Local).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[1].old_value, Some(text_node("one")));
        assert!(events[1].new_value.is_none());
        assert_eq!(adapter.conn.read("/a").await.unwrap(), None);
    }
}
