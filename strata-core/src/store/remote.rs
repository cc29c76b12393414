/*
    remote.rs - Remote store adapter

    Speaks the node contract over an HTTP transport against a per-account
    base URL. Connection readiness is a three-state machine driven only by
    `configure` and `reset`; every operation refuses to touch the network
    unless the state is `connected`.
*/

use crate::store::errors::{StoreError, StoreResult};
use crate::store::events::Listeners;
use crate::store::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::store::node::{Node, Payload, Version};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Status codes interpreted as success.
const SUCCESS_STATUS: [u16; 4] = [200, 201, 204, 207];
/// Status codes interpreted as not found; reads succeed with the empty
/// node.
const NOT_FOUND_STATUS: [u16; 1] = [404];
/// Status codes interpreted as an authorization failure.
const UNAUTHORIZED_STATUS: [u16; 2] = [401, 403];

/// Characters escaped in the bearer token, matching JavaScript's
/// `encodeURIComponent`.
const TOKEN_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Readiness of the remote connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No endpoint is known.
    Anonymous,
    /// An endpoint is known but no credential is set.
    Connecting,
    /// Endpoint and credential are set; operations may run.
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Anonymous => "anonymous",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Already-resolved endpoint descriptor supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Base URL every path is appended to.
    pub href: String,
    /// Protocol variant advertised by the discovery step, if any.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
}

impl StorageInfo {
    pub fn new(href: impl Into<String>) -> Self {
        StorageInfo {
            href: href.into(),
            storage_type: None,
        }
    }
}

/// Options accepted by [`RemoteStore::configure`].
#[derive(Debug, Clone, Default)]
pub struct RemoteOptions {
    pub storage_info: Option<StorageInfo>,
    pub bearer_token: Option<String>,
}

struct RemoteInner {
    storage_info: Option<StorageInfo>,
    bearer_token: Option<String>,
    headers: Vec<(String, String)>,
    state: ConnectionState,
}

/// Remote store adapter over an HTTP transport.
pub struct RemoteStore {
    http: Arc<dyn HttpTransport>,
    inner: Mutex<RemoteInner>,
    state_listeners: Listeners<ConnectionState>,
}

impl RemoteStore {
    /// Create the adapter and apply the initial configuration.
    pub fn new(http: Arc<dyn HttpTransport>, options: RemoteOptions) -> Self {
        let store = RemoteStore {
            http,
            inner: Mutex::new(RemoteInner {
                storage_info: None,
                bearer_token: None,
                headers: Vec::new(),
                state: ConnectionState::Anonymous,
            }),
            state_listeners: Listeners::new(),
        };
        store.configure(options);
        store
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Subscribe to connection-state changes. Notified only on actual
    /// transitions, in subscription order.
    pub fn on_state<F>(&self, callback: F)
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.state_listeners.subscribe(callback);
    }

    /// Recompute the connection state from `options`.
    ///
    /// Fields are stored when present and never cleared here; the computed
    /// state depends only on what this call supplies. A notification is
    /// emitted only when the state actually changes.
    pub fn configure(&self, options: RemoteOptions) {
        let transition = {
            let mut inner = self.lock();
            let mut state = ConnectionState::Anonymous;
            if let Some(info) = options.storage_info {
                inner.storage_info = Some(info);
                state = ConnectionState::Connecting;
                if let Some(token) = options.bearer_token {
                    let encoded = utf8_percent_encode(&token, TOKEN_ESCAPES).to_string();
                    set_header(
                        &mut inner.headers,
                        "Authorization",
                        format!("Bearer {encoded}"),
                    );
                    inner.bearer_token = Some(token);
                    state = ConnectionState::Connected;
                }
            }
            if state != inner.state {
                inner.state = state;
                Some(state)
            } else {
                None
            }
        };
        if let Some(state) = transition {
            debug!(state = %state, "remote connection state changed");
            self.state_listeners.emit(&state);
        }
    }

    /// Clear endpoint, credential and prepared headers, driving the state
    /// back to `anonymous`.
    pub fn reset(&self) {
        {
            let mut inner = self.lock();
            inner.storage_info = None;
            inner.bearer_token = None;
            inner.headers.clear();
        }
        self.configure(RemoteOptions::default());
    }

    /// Read the node at `path`.
    pub async fn get(&self, path: &str) -> StoreResult<Node> {
        let request = self.prepare(Method::Get, path)?;
        let response = self.http.request(request).await?;
        load_node(response)
    }

    /// Write `node` at `path`. A present `node.version` is sent as a
    /// conditional-write precondition.
    pub async fn set(&self, path: &str, node: Node) -> StoreResult<()> {
        let mut request = self.prepare(Method::Put, path)?;
        let (body, content_type) = encode_body(&node)?;
        request
            .headers
            .push(("Content-Type".to_string(), content_type));
        if let Some(version) = &node.version {
            request
                .headers
                .push(("ETag".to_string(), version.as_str().to_string()));
        }
        request.body = Some(body);
        let response = self.http.request(request).await?;
        check_write(response)
    }

    /// Delete the node at `path`.
    pub async fn remove(&self, path: &str) -> StoreResult<()> {
        let request = self.prepare(Method::Delete, path)?;
        let response = self.http.request(request).await?;
        check_write(response)
    }

    /// Build a request against the configured endpoint, or fail with
    /// `NotConnected` before anything touches the network.
    fn prepare(&self, method: Method, path: &str) -> StoreResult<HttpRequest> {
        let inner = self.lock();
        if inner.state != ConnectionState::Connected {
            return Err(StoreError::NotConnected);
        }
        let info = inner.storage_info.as_ref().ok_or(StoreError::NotConnected)?;
        Ok(HttpRequest {
            method,
            url: format!("{}{}", info.href, path),
            headers: inner.headers.clone(),
            body: None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, RemoteInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers
        .iter_mut()
        .find(|(header, _)| header.eq_ignore_ascii_case(name))
    {
        Some((_, existing)) => *existing = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// Serialize a node for transmission: the body bytes plus the
/// `Content-Type` value, `charset=binary` exactly for binary payloads.
fn encode_body(node: &Node) -> StoreResult<(Vec<u8>, String)> {
    let data = node
        .data
        .as_ref()
        .ok_or_else(|| StoreError::Validation("node has no data".to_string()))?;
    let mime_type = node
        .mime_type
        .as_deref()
        .ok_or_else(|| StoreError::Validation("node has no mime type".to_string()))?;

    let body = if mime_type == "application/json" {
        let value = match data {
            Payload::Json(value) => value.clone(),
            Payload::Text(text) => serde_json::Value::String(text.clone()),
            Payload::Binary(_) => {
                return Err(StoreError::Validation(
                    "binary payload cannot be declared application/json".to_string(),
                ))
            }
        };
        serde_json::to_vec(&value).map_err(|e| StoreError::Validation(e.to_string()))?
    } else {
        match data {
            Payload::Json(value) => {
                serde_json::to_vec(value).map_err(|e| StoreError::Validation(e.to_string()))?
            }
            Payload::Text(text) => text.clone().into_bytes(),
            Payload::Binary(bytes) => bytes.clone(),
        }
    };

    let charset = if data.is_binary() { "binary" } else { "utf-8" };
    Ok((body, format!("{mime_type}; charset={charset}")))
}

/// Translate a read response into a node per the status tables.
fn load_node(response: HttpResponse) -> StoreResult<Node> {
    if NOT_FOUND_STATUS.contains(&response.status) {
        return Ok(Node::empty());
    }
    if SUCCESS_STATUS.contains(&response.status) {
        let content_type = response.header("content-type").unwrap_or("").to_string();
        let mime_type = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        let version = response.header("etag").map(Version::new);

        let data = if mime_type == "application/json" {
            match serde_json::from_slice(&response.body) {
                Ok(value) => Payload::Json(value),
                Err(_) => return Err(StoreError::InvalidJson(response)),
            }
        } else if content_type.contains("charset=binary") {
            Payload::Binary(response.body.clone())
        } else {
            Payload::Text(String::from_utf8_lossy(&response.body).into_owned())
        };

        let mime_type = if mime_type.is_empty() {
            None
        } else {
            Some(mime_type)
        };
        return Ok(Node {
            data: Some(data),
            mime_type,
            version,
        });
    }
    if UNAUTHORIZED_STATUS.contains(&response.status) {
        return Err(StoreError::Unauthorized(response));
    }
    Err(StoreError::UnexpectedResponse(response))
}

/// Classify a write response under the same status tables as reads.
fn check_write(response: HttpResponse) -> StoreResult<()> {
    if SUCCESS_STATUS.contains(&response.status) || NOT_FOUND_STATUS.contains(&response.status) {
        return Ok(());
    }
    if UNAUTHORIZED_STATUS.contains(&response.status) {
        return Err(StoreError::Unauthorized(response));
    }
    Err(StoreError::UnexpectedResponse(response))
}
