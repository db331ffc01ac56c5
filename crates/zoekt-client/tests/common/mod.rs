//! Shared helpers for dispatcher integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use zoekt_client::{
    BackendNode, ClientError, HttpRequest, HttpResponse, NodeId, StaticNodeRegistry, TokenIssuer,
    Transport, TransportError, ZoektClient, ZoektClientBuilder,
};

pub const SECRET: &[u8] = b"integration-secret";

pub const OK_BODY: &str =
    r#"{"Result": {"FileCount": 1, "MatchCount": 2, "Files": [{"FileName": "main.rs"}]}}"#;

/// Token issuer returning a constant header.
pub struct StaticToken;

impl TokenIssuer for StaticToken {
    fn authorization_header(&self) -> Result<String, ClientError> {
        Ok("Bearer static".to_string())
    }
}

/// Transport that records requests and answers with a fixed outcome.
pub struct RecordingTransport {
    pub requests: Mutex<Vec<HttpRequest>>,
    outcome: Result<HttpResponse, TransportError>,
}

impl RecordingTransport {
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            outcome: Ok(HttpResponse::new(status, body)),
        })
    }

    pub fn failing(err: TransportError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            outcome: Err(err),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.outcome.clone()
    }
}

/// Counts ERROR level events.
#[derive(Clone, Default)]
pub struct ErrorCounter(pub Arc<AtomicUsize>);

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Registry with node 1 and node 2 at the given base URLs.
pub fn two_nodes(url1: &str, url2: &str) -> StaticNodeRegistry {
    StaticNodeRegistry::from_nodes(vec![
        BackendNode::new(NodeId(1), url1),
        BackendNode::new(NodeId(2), url2),
    ])
}

pub fn builder(registry: StaticNodeRegistry) -> ZoektClientBuilder {
    ZoektClient::builder()
        .registry(registry)
        .token_issuer(StaticToken)
}
