//! Webhook handler: the public `/webhook/{callback_action}` endpoint.
//!
//! # Data Flow
//! ```text
//! POST /webhook/on_select
//!     → validate body + correlation pair
//!     → reverse-map callback action to forward action
//!     → publish envelope through the rendezvous engine
//!     → 200 ACK | 404 NACK (no pending waiter) | 400 (invalid)
//! ```
//!
//! The slot, key and channel are all derived under the *forward* action
//! name even though the URL carries the callback name; the route table is
//! the only bridge between the two URL families.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::protocol::{self, CorrelationError};
use crate::rendezvous::{CallbackEnvelope, EngineError};
use crate::routing::table;

use super::server::AppState;

pub async fn handle(
    State(state): State<AppState>,
    Path(callback_action): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if callback_action.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "action is required");
    }

    let correlation = match protocol::extract_correlation(&body) {
        Ok(correlation) => correlation,
        Err(err @ CorrelationError::InvalidJson) => {
            tracing::warn!(callback = %callback_action, "rejected webhook: invalid JSON");
            return error_body(StatusCode::BAD_REQUEST, &err.to_string());
        }
        Err(err @ CorrelationError::MissingIds) => {
            tracing::warn!(callback = %callback_action, "rejected webhook: missing correlation ids");
            return error_body(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let Some(forward_action) = table::forward_of(&callback_action) else {
        tracing::warn!(callback = %callback_action, "unknown callback route");
        return error_body(
            StatusCode::BAD_REQUEST,
            &format!("Invalid callback route: {}", callback_action),
        );
    };

    tracing::info!(
        callback = %callback_action,
        action = %forward_action,
        transaction_id = %correlation.transaction_id,
        message_id = %correlation.message_id,
        "callback received"
    );

    let envelope = CallbackEnvelope {
        body: body.to_vec(),
        status_code: StatusCode::OK.as_u16(),
        headers: snapshot_headers(&headers),
    };

    match state
        .engine
        .publish(
            forward_action,
            &correlation.transaction_id,
            &correlation.message_id,
            envelope,
        )
        .await
    {
        Ok(()) => (StatusCode::OK, Json(protocol::ack())).into_response(),
        Err(EngineError::NoPendingRequest) => {
            tracing::warn!(
                action = %forward_action,
                transaction_id = %correlation.transaction_id,
                "callback had no pending waiter"
            );
            (StatusCode::NOT_FOUND, Json(protocol::no_pending_nack())).into_response()
        }
        Err(err) => {
            tracing::error!(action = %forward_action, error = %err, "failed to publish callback");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

/// Webhook request headers as they travel in the envelope. `Host` names
/// this façade, not the upstream, so it never crosses.
fn snapshot_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| *name != HOST)
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn host_is_excluded_from_the_snapshot() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("facade.local"));
        headers.insert("x-gateway-sig", HeaderValue::from_static("abc"));

        let snapshot = snapshot_headers(&headers);
        assert!(!snapshot.contains_key("host"));
        assert_eq!(snapshot.get("x-gateway-sig").unwrap(), "abc");
    }
}
