//! BAP Bridge, a synchronous façade over the BAP network protocol.
//!
//! The upstream network speaks a two-legged protocol: `search`/`discover`
//! reply on the same HTTP exchange, while the remaining actions ACK
//! immediately and deliver the real reply later to a registered webhook.
//! This service hides the distinction. Every client call appears
//! synchronous, returning either the real reply or a structured timeout.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                  BAP BRIDGE                   │
//!                      │                                               │
//!  POST /api/{action}  │  ┌─────────┐   ┌────────────┐   ┌──────────┐  │
//!  ────────────────────┼─▶│  http   │──▶│ rendezvous │──▶│ storage  │  │
//!                      │  │ forward │   │   engine   │   │ (redis)  │  │
//!  (suspended...)      │  └────┬────┘   └─────▲──────┘   └──────────┘  │
//!                      │       │              │                        │
//!                      │       ▼ detached     │ publish / wake         │
//!                      │  ┌─────────┐   ┌─────┴──────┐                 │
//!                      │  │upstream │   │   http     │◀────────────────┼── POST /webhook/{on_action}
//!                      │  │ client  │   │  webhook   │                 │
//!                      │  └─────────┘   └────────────┘                 │
//!                      │                                               │
//!                      │  ┌─────────────────────────────────────────┐  │
//!                      │  │ Cross-cutting: config · transform ·     │  │
//!                      │  │ routing table · lifecycle · protocol    │  │
//!                      │  └─────────────────────────────────────────┘  │
//!                      └───────────────────────────────────────────────┘
//! ```
//!
//! Sync actions bypass the rendezvous engine entirely and go through the
//! per-route transformation pipeline instead.

// Core subsystems
pub mod http;
pub mod rendezvous;
pub mod routing;
pub mod storage;

// Outbound & transformation
pub mod transform;
pub mod upstream;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod protocol;

pub use config::Config;
pub use http::server::{build_router, AppState};
pub use rendezvous::Rendezvous;
