//! Shared key-value + pub/sub store port.
//!
//! # Responsibilities
//! - Abstract the cross-replica store behind a narrow capability bundle
//! - TTL'd keys for pending-slot existence checks
//! - Pub/sub channels for waking suspended exchanges
//!
//! # Design Decisions
//! - The port is the only coupling to the remote store; the engine and
//!   handlers never see a client type
//! - Subscribers receive only messages published after the subscription is
//!   established; publishing with zero subscribers is a silent drop
//! - No retries here: store failures are reported upward as-is

pub mod memory;
pub mod redis;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Error from the underlying store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store connection failed: {0}")]
    Connection(String),
}

/// Capability bundle the rendezvous engine consumes.
#[async_trait]
pub trait Store: Send + Sync {
    /// Write a key with a TTL, overwriting any existing value.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Whether a key currently exists (expired keys do not).
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete a key. Deleting an absent key is a no-op.
    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// List keys matching a trailing-`*` glob. Diagnostics only.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Publish a payload on a channel, returning the subscriber count.
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize, StoreError>;

    /// Subscribe to a channel. The subscription is live once this returns.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;
}

/// A live pub/sub subscription. Dropping it tears the subscription down.
pub struct Subscription {
    stream: Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>,
}

impl Subscription {
    pub fn new(stream: impl Stream<Item = Vec<u8>> + Send + 'static) -> Self {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Next payload on the channel, or `None` if the channel closed.
    pub async fn next(&mut self) -> Option<Vec<u8>> {
        self.stream.next().await
    }
}
