//! Protocol shapes shared by both route families.
//!
//! # Responsibilities
//! - Extract the correlation pair from a request body
//! - Build the canonical ACK/NACK bodies
//!
//! # Design Decisions
//! - Correlation parsing reads only `context.{transaction_id,message_id}`
//!   and ignores everything else in the body
//! - ACK/NACK are always JSON objects under `message.ack.status`

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// The identity tuple used for rendezvous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub transaction_id: String,
    pub message_id: String,
}

/// Why a body yielded no correlation pair.
#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("context.transaction_id and context.message_id are required")]
    MissingIds,
}

#[derive(Debug, Default, Deserialize)]
struct RawContext {
    #[serde(default)]
    transaction_id: String,
    #[serde(default)]
    message_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    context: RawContext,
}

/// Read the correlation pair out of a request body.
pub fn extract_correlation(body: &[u8]) -> Result<Correlation, CorrelationError> {
    let envelope: RawEnvelope =
        serde_json::from_slice(body).map_err(|_| CorrelationError::InvalidJson)?;

    let RawContext {
        transaction_id,
        message_id,
    } = envelope.context;
    if transaction_id.is_empty() || message_id.is_empty() {
        return Err(CorrelationError::MissingIds);
    }
    Ok(Correlation {
        transaction_id,
        message_id,
    })
}

/// Positive acknowledgement.
pub fn ack() -> Value {
    json!({"message": {"ack": {"status": "ACK"}}})
}

/// NACK returned to the client when the async wait times out.
pub fn timeout_nack() -> Value {
    json!({
        "message": {"ack": {"status": "NACK"}},
        "error": {
            "type": "TIMEOUT",
            "code": "REQUEST_TIMEOUT",
            "message": "No response received within 30 seconds",
        }
    })
}

/// NACK returned to a webhook that has no pending waiter.
pub fn no_pending_nack() -> Value {
    json!({
        "message": {"ack": {"status": "NACK"}},
        "error": {"message": "No pending request found for this transaction"}
    })
}
