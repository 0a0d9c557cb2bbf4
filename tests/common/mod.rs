//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;

use bap_bridge::http::{build_router, AppState};
use bap_bridge::rendezvous::Rendezvous;
use bap_bridge::storage::{MemoryStore, Store};
use bap_bridge::transform::{JsonataEvaluator, Transformer};
use bap_bridge::upstream::UpstreamClient;

/// A façade instance listening on an ephemeral port, with a handle on its
/// store for asserting slot lifecycle.
pub struct Facade {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
}

#[allow(dead_code)]
impl Facade {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Poll until the key exists (or not), for synchronizing with the
    /// handler's slot registration and cleanup.
    pub async fn wait_for_key(&self, key: &str, present: bool) {
        for _ in 0..100 {
            if self.store.exists(key).await.unwrap() == present {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("key '{key}' never became {}", if present { "present" } else { "absent" });
    }
}

/// Spawn the façade against the given upstream with a passthrough (no
/// mappings) transformer.
pub async fn spawn_facade(upstream_url: &str, wait_timeout: Duration) -> Facade {
    let transformer = Transformer::disabled(Arc::new(JsonataEvaluator::new()));
    spawn_facade_with(upstream_url, transformer, wait_timeout).await
}

/// Spawn the façade with a specific transformer.
pub async fn spawn_facade_with(
    upstream_url: &str,
    transformer: Transformer,
    wait_timeout: Duration,
) -> Facade {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(Rendezvous::new(store.clone() as Arc<dyn Store>));
    let upstream = UpstreamClient::new(upstream_url, Duration::from_secs(5)).unwrap();

    let mut state = AppState::new(engine, Arc::new(transformer), upstream);
    state.wait_timeout = wait_timeout;

    let addr = spawn_server(build_router(state)).await;
    Facade { addr, store }
}

/// Serve any router on an ephemeral port.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// One request captured by the mock upstream.
#[allow(dead_code)]
pub struct CapturedRequest {
    pub action: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Requests seen by a mock upstream, in arrival order.
#[derive(Clone, Default)]
pub struct UpstreamLog {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

#[allow(dead_code)]
impl UpstreamLog {
    pub fn take(&self) -> Vec<CapturedRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn push(&self, captured: CapturedRequest) {
        self.requests.lock().unwrap().push(captured);
    }
}

/// Start a mock upstream that records every request and replies with a
/// fixed status and body.
#[allow(dead_code)]
pub async fn start_mock_upstream(status: u16, body: &'static str) -> (SocketAddr, UpstreamLog) {
    let log = UpstreamLog::default();
    let capture = log.clone();

    let router = Router::new().route(
        "/{*action}",
        post(
            move |Path(action): Path<String>, headers: HeaderMap, bytes: Bytes| {
                let capture = capture.clone();
                async move {
                    capture.push(CapturedRequest {
                        action,
                        headers,
                        body: bytes.to_vec(),
                    });
                    (axum::http::StatusCode::from_u16(status).unwrap(), body).into_response()
                }
            },
        ),
    );

    let addr = spawn_server(router).await;
    (addr, log)
}
