//! In-process store.
//!
//! Implements the full port contract (TTL'd keys, channel fan-out, no
//! replay) so the rendezvous engine and handlers can be exercised without
//! a live Redis. Not suitable for multi-replica deployments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{Store, StoreError, Subscription};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    channels: HashMap<String, Vec<mpsc::UnboundedSender<Vec<u8>>>>,
}

/// Shared-nothing stand-in for the remote store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens if a holder panicked; the map is
        // still structurally sound, so continue with the inner value.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn expired(entry: &Entry) -> bool {
    Instant::now() >= entry.expires_at
}

#[async_trait]
impl Store for MemoryStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if inner.entries.get(key).is_some_and(expired) {
            inner.entries.remove(key);
        }
        Ok(inner.entries.contains_key(key))
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.lock().entries.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.lock();
        let matches = |key: &str| match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        };
        Ok(inner
            .entries
            .iter()
            .filter(|(key, entry)| matches(key) && !expired(entry))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let mut delivered = 0;
        let mut drained = false;
        if let Some(senders) = inner.channels.get_mut(channel) {
            senders.retain(|tx| !tx.is_closed());
            for tx in senders.iter() {
                if tx.send(payload.to_vec()).is_ok() {
                    delivered += 1;
                }
            }
            drained = senders.is_empty();
        }
        if drained {
            inner.channels.remove(channel);
        }
        Ok(delivered)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock()
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(tx);

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        });
        Ok(Subscription::new(stream))
    }
}
