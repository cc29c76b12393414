/*
    node.rs - The unit of storage exchanged with every backing store

    A node couples an opaque payload with its content type and an opaque
    version token. A node that does not exist is represented by the single
    canonical empty value, never by an error.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version token, equivalent to an HTTP ETag.
///
/// Tokens are compared only for equality; no ordering or structure is
/// assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(token: impl Into<String>) -> Self {
        Version(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Version {
    fn from(token: String) -> Self {
        Version(token)
    }
}

impl From<&str> for Version {
    fn from(token: &str) -> Self {
        Version(token.to_string())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload carried by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// A JSON document; `application/json` nodes round-trip through this.
    Json(serde_json::Value),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes; rendered with `charset=binary` on the wire.
    Binary(Vec<u8>),
}

impl Payload {
    /// Whether this payload is raw binary data.
    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary(_))
    }
}

/// The versioned data record exchanged with a store.
///
/// `data`, `mime_type` and `version` are all `None` together exactly when
/// the node does not exist; that value is [`Node::empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// The stored payload, or `None` for a node that does not exist.
    pub data: Option<Payload>,
    /// Content type of the payload.
    pub mime_type: Option<String>,
    /// Version token of the stored revision; `None` when non-existent.
    pub version: Option<Version>,
}

impl Node {
    /// The canonical empty node: the value of any read whose target is
    /// absent or not found.
    pub fn empty() -> Self {
        Node {
            data: None,
            mime_type: None,
            version: None,
        }
    }

    /// A node carrying `data` typed as `mime_type`, with no version yet.
    pub fn new(data: Payload, mime_type: impl Into<String>) -> Self {
        Node {
            data: Some(data),
            mime_type: Some(mime_type.into()),
            version: None,
        }
    }

    /// Attach a version token, as returned by a store or carried as a
    /// conditional-write precondition.
    pub fn with_version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Whether this node refers to a stored revision.
    pub fn exists(&self) -> bool {
        self.version.is_some()
    }
}
