//! Storage-adapter smoke harness
//!
//! Drives both adapters end to end without any external service: the local
//! store over the in-memory backend, the remote store over a canned
//! transport that answers like a node server. Useful for eyeballing the
//! adapter behavior and the change/state notifications.

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use strata_core::store::{
    HttpRequest, HttpResponse, HttpTransport, LocalStore, MemoryBackend, Method, Node, Payload,
    RemoteOptions, RemoteStore, StorageInfo, TransportResult,
};
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(name = "test-harness")]
#[command(about = "Strata storage-adapter smoke harness", long_about = None)]
struct Args {
    /// Path prefix used for the scenario records
    #[arg(long, default_value = "/harness")]
    prefix: String,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,
}

/// Answers requests from an in-memory node map, like a node server would.
struct CannedTransport {
    nodes: Mutex<HashMap<String, (String, Vec<u8>)>>,
    next_etag: AtomicU64,
}

impl CannedTransport {
    fn new() -> Self {
        CannedTransport {
            nodes: Mutex::new(HashMap::new()),
            next_etag: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl HttpTransport for CannedTransport {
    async fn request(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let mut nodes = self.nodes.lock().await;
        let response = match request.method {
            Method::Get => match nodes.get(&request.url) {
                Some((content_type, body)) => HttpResponse {
                    status: 200,
                    headers: vec![
                        ("content-type".to_string(), content_type.clone()),
                        ("etag".to_string(), "canned".to_string()),
                    ],
                    body: body.clone(),
                },
                None => HttpResponse {
                    status: 404,
                    headers: Vec::new(),
                    body: Vec::new(),
                },
            },
            Method::Put => {
                let content_type = request
                    .header("content-type")
                    .unwrap_or("application/octet-stream")
                    .to_string();
                nodes.insert(
                    request.url.clone(),
                    (content_type, request.body.unwrap_or_default()),
                );
                let etag = self.next_etag.fetch_add(1, Ordering::Relaxed);
                HttpResponse {
                    status: 201,
                    headers: vec![("etag".to_string(), format!("rev-{etag}"))],
                    body: Vec::new(),
                }
            }
            Method::Delete => {
                nodes.remove(&request.url);
                HttpResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: Vec::new(),
                }
            }
        };
        Ok(response)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::parse(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });
    init_logging_with_config(LogConfig::new(log_level).json_format(args.json_logs))?;

    let prefix = args.prefix;

    println!("== local store over the memory backend ==");
    let local = LocalStore::open(MemoryBackend::new(), "harness");
    local.on_change(|event| {
        println!(
            "  change: {} ({:?}) old={} new={}",
            event.path,
            event.origin,
            event.old_value.is_some(),
            event.new_value.is_some()
        );
    });

    let note = Node::new(
        Payload::Json(serde_json::json!({"body": "hello from the harness"})),
        "application/json",
    );
    local.set(&format!("{prefix}/note"), note).await?;
    let loaded = local.get(&format!("{prefix}/note")).await?;
    println!("  get -> {:?}", loaded.data);
    local.remove(&format!("{prefix}/note")).await?;
    println!(
        "  after remove -> exists: {}",
        local.get(&format!("{prefix}/note")).await?.exists()
    );

    println!("== remote store over the canned transport ==");
    let remote = RemoteStore::new(Arc::new(CannedTransport::new()), RemoteOptions::default());
    remote.on_state(|state| println!("  state -> {state}"));

    remote.configure(RemoteOptions {
        storage_info: Some(StorageInfo::new("https://example.test/storage/harness")),
        bearer_token: Some("harness-token".to_string()),
    });

    remote
        .set(
            &format!("{prefix}/note"),
            Node::new(Payload::Text("stored remotely".to_string()), "text/plain"),
        )
        .await?;
    let loaded = remote.get(&format!("{prefix}/note")).await?;
    println!("  get -> {:?} (version {:?})", loaded.data, loaded.version);

    remote.remove(&format!("{prefix}/note")).await?;
    println!(
        "  after remove -> exists: {}",
        remote.get(&format!("{prefix}/note")).await?.exists()
    );

    remote.reset();
    println!("done");
    Ok(())
}
