//! Correlated rendezvous subsystem.
//!
//! # Data Flow
//! ```text
//! Forward handler:
//!     register slot → subscribe channel → dispatch upstream → wait
//!
//! Webhook handler:
//!     slot exists? → publish envelope → delete slot
//! ```
//!
//! # Design Decisions
//! - Slot key and wake channel derive from the same tuple via the same
//!   pure functions; a webhook can only wake the matching waiter
//! - Slot TTL strictly exceeds the client wait so a slot never vanishes
//!   under a live waiter due solely to expiry
//! - At-most-once: the published payload wakes whoever is subscribed at
//!   that instant, and the slot is consumed with it

pub mod engine;
pub mod keys;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use engine::{CallbackWaiter, EngineError, ReleaseGuard, Rendezvous};

/// How long a pending slot survives without being consumed.
pub const SLOT_TTL: Duration = Duration::from_secs(35);

/// How long a suspended client exchange waits for its callback.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for outbound calls to the upstream service.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Payload published to wake a suspended exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackEnvelope {
    pub body: Vec<u8>,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
}
