//! HTTP surface of the façade.
//!
//! # Data Flow
//! ```text
//! POST /api/{action}      → forward.rs (sync leg or rendezvous wait)
//! POST /webhook/{action}  → webhook.rs (validate, publish, ACK/NACK)
//! GET  /health            → server.rs liveness probe
//! ```

pub mod forward;
pub mod server;
pub mod webhook;

pub use server::{build_router, serve, AppState};
