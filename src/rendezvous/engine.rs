//! The rendezvous engine: slot lifecycle and pub/sub wake-up.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{Store, StoreError, Subscription};

use super::{keys, CallbackEnvelope, SLOT_TTL};

/// Error from a rendezvous operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no pending request found")]
    NoPendingRequest,

    #[error("timeout waiting for callback")]
    Timeout,

    #[error("callback channel closed before a payload arrived")]
    SubscriptionClosed,

    #[error("callback payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Metadata stored under a pending-slot key. Its existence is the
/// invariant the webhook checks; the fields are diagnostics.
#[derive(Debug, Serialize, Deserialize)]
struct SlotMetadata {
    transaction_id: String,
    message_id: String,
    created_at: String,
}

/// Barrier keyed by `(action, transaction_id, message_id)`.
pub struct Rendezvous {
    store: Arc<dyn Store>,
}

impl Rendezvous {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record that a waiter exists for the correlation pair.
    ///
    /// Overwriting an existing slot is allowed: last writer wins, and at
    /// most one of the overlapping waiters will observe the published
    /// payload.
    pub async fn register(
        &self,
        action: &str,
        transaction_id: &str,
        message_id: &str,
    ) -> Result<(), EngineError> {
        let key = keys::pending_key(action, transaction_id, message_id);
        let metadata = SlotMetadata {
            transaction_id: transaction_id.to_string(),
            message_id: message_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        let value = serde_json::to_vec(&metadata)?;

        self.store.set(&key, &value, SLOT_TTL).await?;
        tracing::debug!(key = %key, ttl_secs = SLOT_TTL.as_secs(), "registered pending slot");
        Ok(())
    }

    /// Open the wake channel for the correlation pair.
    ///
    /// Must be called before the outbound request is dispatched: pub/sub
    /// has no replay, so a payload published before the subscription is
    /// established would be lost.
    pub async fn subscribe(
        &self,
        action: &str,
        transaction_id: &str,
        message_id: &str,
    ) -> Result<CallbackWaiter, EngineError> {
        let channel = keys::callback_channel(action, transaction_id, message_id);
        let subscription = self.store.subscribe(&channel).await?;
        tracing::debug!(channel = %channel, "subscribed for callback");
        Ok(CallbackWaiter { subscription })
    }

    /// Route a callback envelope to the waiter for the correlation pair.
    ///
    /// The pending slot is the gate: if it is absent the callback has no
    /// (live or recent) waiter and `NoPendingRequest` is returned. Zero
    /// subscribers with a present slot means the waiter just timed out;
    /// the publish is still reported as success and the slot is consumed.
    pub async fn publish(
        &self,
        action: &str,
        transaction_id: &str,
        message_id: &str,
        envelope: CallbackEnvelope,
    ) -> Result<(), EngineError> {
        let key = keys::pending_key(action, transaction_id, message_id);

        if !self.store.exists(&key).await? {
            if let Ok(pending) = self.store.keys("Sync#*").await {
                tracing::debug!(
                    key = %key,
                    pending_slots = pending.len(),
                    "no pending slot for callback"
                );
            }
            return Err(EngineError::NoPendingRequest);
        }

        let channel = keys::callback_channel(action, transaction_id, message_id);
        let payload = serde_json::to_vec(&envelope)?;
        let subscribers = self.store.publish(&channel, &payload).await?;
        tracing::info!(channel = %channel, subscribers, "published callback");

        self.store.del(&key).await?;
        Ok(())
    }

    /// Delete the pending slot. Idempotent; used on waiter teardown.
    pub async fn release(
        &self,
        action: &str,
        transaction_id: &str,
        message_id: &str,
    ) -> Result<(), EngineError> {
        let key = keys::pending_key(action, transaction_id, message_id);
        self.store.del(&key).await?;
        Ok(())
    }
}

/// A subscribed waiter, ready to suspend until its callback arrives.
pub struct CallbackWaiter {
    subscription: Subscription,
}

impl CallbackWaiter {
    /// Suspend until a callback envelope arrives or the timeout elapses.
    pub async fn wait(mut self, timeout: Duration) -> Result<CallbackEnvelope, EngineError> {
        match tokio::time::timeout(timeout, self.subscription.next()).await {
            Ok(Some(payload)) => Ok(serde_json::from_slice(&payload)?),
            Ok(None) => Err(EngineError::SubscriptionClosed),
            Err(_) => Err(EngineError::Timeout),
        }
    }
}

/// RAII release of a pending slot, covering every exit path of a waiter:
/// timeout, error, and client disconnect alike.
pub struct ReleaseGuard {
    engine: Arc<Rendezvous>,
    action: String,
    transaction_id: String,
    message_id: String,
}

impl ReleaseGuard {
    pub fn new(
        engine: Arc<Rendezvous>,
        action: &str,
        transaction_id: &str,
        message_id: &str,
    ) -> Self {
        Self {
            engine,
            action: action.to_string(),
            transaction_id: transaction_id.to_string(),
            message_id: message_id.to_string(),
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let engine = Arc::clone(&self.engine);
        let action = std::mem::take(&mut self.action);
        let transaction_id = std::mem::take(&mut self.transaction_id);
        let message_id = std::mem::take(&mut self.message_id);
        // The waiter's future may be dropped mid-suspend (client gone);
        // the delete has to outlive it.
        tokio::spawn(async move {
            if let Err(err) = engine.release(&action, &transaction_id, &message_id).await {
                tracing::warn!(error = %err, action = %action, "failed to release pending slot");
            }
        });
    }
}
