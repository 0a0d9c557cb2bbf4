//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Connect store → Load transforms → Serve
//!
//! Shutdown:
//!     SIGINT/SIGTERM → broadcast → server stops accepting, suspended
//!     exchanges drain → process exits
//! ```
//!
//! # Design Decisions
//! - Suspended waiters are never aborted on shutdown: every in-flight
//!   exchange still ends in a wake, a timeout NACK, or its release guard,
//!   so no pending slot outlives the drain by more than its TTL
//! - SIGINT and SIGTERM mean the same thing; Ctrl+C and an orchestrator
//!   stop behave identically

use tokio::sync::broadcast;

/// Arm SIGINT/SIGTERM handling and return the receiver the HTTP server
/// drains on.
pub fn shutdown_signal() -> broadcast::Receiver<()> {
    let (tx, rx) = broadcast::channel(1);

    let on_interrupt = tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received SIGINT, draining suspended exchanges");
                let _ = on_interrupt.send(());
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGINT"),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("received SIGTERM, draining suspended exchanges");
                let _ = tx.send(());
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    });
    #[cfg(not(unix))]
    let _ = tx;

    rx
}
