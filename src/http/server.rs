//! Router construction and serving.
//!
//! # Responsibilities
//! - Build the axum Router with the two catch-all route families
//! - Inject the application ports into handlers via state
//! - Serve with graceful shutdown
//!
//! # Design Decisions
//! - All cross-request state lives in the store; `AppState` holds only
//!   injected ports and is cheap to clone per request
//! - The bare `/api` and `/webhook` paths answer 400 explicitly, matching
//!   the empty-action rejection of the wildcard handlers

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::rendezvous::{Rendezvous, WAIT_TIMEOUT};
use crate::transform::Transformer;
use crate::upstream::UpstreamClient;

use super::{forward, webhook};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Rendezvous>,
    pub transformer: Arc<Transformer>,
    pub upstream: UpstreamClient,
    /// How long the async leg waits for its callback. Constant in
    /// production; tests shorten it.
    pub wait_timeout: Duration,
}

impl AppState {
    pub fn new(
        engine: Arc<Rendezvous>,
        transformer: Arc<Transformer>,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            engine,
            transformer,
            upstream,
            wait_timeout: WAIT_TIMEOUT,
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/{*action}", post(forward::handle))
        .route("/api", post(missing_action))
        .route("/webhook/{*action}", post(webhook::handle))
        .route("/webhook", post(missing_action))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the router until the shutdown signal fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("shutdown signal received, draining connections");
        })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "message": "Server is running"}))
}

async fn missing_action() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "action is required"})),
    )
}
