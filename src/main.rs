//! BAP Bridge entry point.
//!
//! Startup order matters: configuration first, then the store (fatal if
//! unreachable), then the transform mappings (non-fatal if absent), then
//! the listener.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bap_bridge::config::Config;
use bap_bridge::http::{build_router, serve, AppState};
use bap_bridge::lifecycle::shutdown_signal;
use bap_bridge::rendezvous::{Rendezvous, UPSTREAM_TIMEOUT};
use bap_bridge::storage::RedisStore;
use bap_bridge::transform::{load_mappings, JsonataEvaluator, Transformer};
use bap_bridge::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bap_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        port = config.port,
        app_env = %config.app_env,
        upstream_url = %config.upstream_url,
        redis_addr = %config.redis_addr,
        "configuration loaded"
    );

    let store = RedisStore::connect(&config.redis_connection_url()).await?;
    tracing::info!(addr = %config.redis_addr, "connected to store");

    let evaluator = Arc::new(JsonataEvaluator::new());
    let transformer = match load_mappings(&config.mappings_path) {
        Ok(mappings) => Arc::new(Transformer::new(mappings, evaluator)),
        Err(err) => {
            tracing::warn!(
                path = %config.mappings_path.display(),
                error = %err,
                "transform mappings unavailable, continuing without transformation"
            );
            Arc::new(Transformer::disabled(evaluator))
        }
    };

    let engine = Arc::new(Rendezvous::new(Arc::new(store)));
    let upstream = UpstreamClient::new(&config.upstream_url, UPSTREAM_TIMEOUT)?;
    let state = AppState::new(engine, transformer, upstream);

    let listener = TcpListener::bind(config.listen_addr()).await?;
    serve(listener, build_router(state), shutdown_signal()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
