//! Slot-key and wake-channel derivation.
//!
//! Both names derive from the same `(action, transaction_id, message_id)`
//! tuple. The distinct prefixes let diagnostics scan pending keys without
//! matching channel names.

/// Store key recording that a waiter exists for a correlation pair.
pub fn pending_key(action: &str, transaction_id: &str, message_id: &str) -> String {
    format!("Sync#{}#{}#{}", action, message_id, transaction_id)
}

/// Pub/sub channel the waiter listens on for its callback.
pub fn callback_channel(action: &str, transaction_id: &str, message_id: &str) -> String {
    format!("Callback#{}#{}#{}", action, message_id, transaction_id)
}
