//! Integration tests for the local store adapter over the SQLite backend.

use strata_core::store::{LocalStore, Node, Payload, SqliteBackend};
use tempfile::tempdir;

fn json_node() -> Node {
    Node::new(
        Payload::Json(serde_json::json!({"kind": "note", "body": "persisted"})),
        "application/json",
    )
    .with_version("rev-1")
}

#[tokio::test]
async fn test_round_trip_over_sqlite() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(SqliteBackend::new(dir.path()), "nodes-suite");

    store.set("/notes/a", json_node()).await.unwrap();

    let node = store.get("/notes/a").await.unwrap();
    assert_eq!(
        node.data,
        Some(Payload::Json(
            serde_json::json!({"kind": "note", "body": "persisted"})
        ))
    );
    assert_eq!(node.mime_type.as_deref(), Some("application/json"));
    assert!(node.exists());

    store.remove("/notes/a").await.unwrap();
    assert_eq!(store.get("/notes/a").await.unwrap(), Node::empty());
}

#[tokio::test]
async fn test_records_survive_a_new_adapter_instance() {
    let dir = tempdir().unwrap();

    {
        let store = LocalStore::open(SqliteBackend::new(dir.path()), "nodes-suite");
        store.set("/kept", json_node()).await.unwrap();
    }

    let store = LocalStore::open(SqliteBackend::new(dir.path()), "nodes-suite");
    let node = store.get("/kept").await.unwrap();
    assert!(node.exists());
    assert_eq!(node.version.as_ref().map(|v| v.as_str()), Some("rev-1"));
}

#[tokio::test]
async fn test_distinct_store_names_are_isolated() {
    let dir = tempdir().unwrap();

    let first = LocalStore::open(SqliteBackend::new(dir.path()), "alpha");
    first.set("/shared", json_node()).await.unwrap();

    let second = LocalStore::open(SqliteBackend::new(dir.path()), "beta");
    assert_eq!(second.get("/shared").await.unwrap(), Node::empty());
}

#[tokio::test]
async fn test_text_payload_round_trips() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(SqliteBackend::new(dir.path()), "nodes-suite");

    let node = Node::new(Payload::Text("plain body".to_string()), "text/plain");
    store.set("/plain", node).await.unwrap();

    let loaded = store.get("/plain").await.unwrap();
    assert_eq!(loaded.data, Some(Payload::Text("plain body".to_string())));
    assert_eq!(loaded.mime_type.as_deref(), Some("text/plain"));
}
