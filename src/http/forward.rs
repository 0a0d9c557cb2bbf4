//! Forward handler: the public `/api/{action}` endpoint.
//!
//! # Data Flow
//! ```text
//! sync action:   transform? → upstream POST → gunzip? → transform? → relay
//! async action:  register slot → subscribe → detached dispatch → wait
//!                    → relay callback envelope | 408 timeout NACK
//! ```
//!
//! # Design Decisions
//! - The subscription is established before the outbound dispatch; pub/sub
//!   has no replay, so the reverse order admits a lost wake
//! - The release guard covers every exit, including the client
//!   disconnecting mid-wait
//! - The sync leg's response transform is keyed by the callback action
//!   name but applied in the forward direction, matching the behavior the
//!   network observes today

use std::io::Read;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use flate2::read::GzDecoder;
use serde_json::json;

use crate::protocol::{self, Correlation, CorrelationError};
use crate::rendezvous::{CallbackEnvelope, EngineError, ReleaseGuard};
use crate::routing::table;
use crate::transform::{mapping_error_body, TransformError};

use super::server::AppState;

pub async fn handle(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if action.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "action is required");
    }

    let correlation = match protocol::extract_correlation(&body) {
        Ok(correlation) => correlation,
        Err(err @ CorrelationError::InvalidJson) => {
            tracing::warn!(action = %action, "rejected forward request: invalid JSON");
            return error_body(StatusCode::BAD_REQUEST, &err.to_string());
        }
        Err(err @ CorrelationError::MissingIds) => {
            tracing::warn!(action = %action, "rejected forward request: missing correlation ids");
            return error_body(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    tracing::info!(
        action = %action,
        transaction_id = %correlation.transaction_id,
        message_id = %correlation.message_id,
        sync = table::is_sync(&action),
        "forward request received"
    );

    if table::is_sync(&action) {
        sync_leg(state, &action, &headers, &body).await
    } else {
        async_leg(state, &action, &headers, &body, &correlation).await
    }
}

/// Direct request/response exchange with the upstream, with the
/// per-route transformation pipeline on both sides.
async fn sync_leg(state: AppState, action: &str, headers: &HeaderMap, body: &[u8]) -> Response {
    let mut outbound = body.to_vec();
    if state.transformer.has_mapping(action) {
        match state.transformer.transform_forward(action, &outbound) {
            Ok(transformed) => outbound = transformed,
            Err(err) => {
                tracing::error!(action = %action, error = %err, "forward transformation failed");
                return mapping_error(action, &err);
            }
        }
    }

    let response = match state.upstream.post(action, headers, outbound).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(action = %action, error = %err, "synchronous upstream request failed");
            return error_body(
                StatusCode::BAD_GATEWAY,
                "Failed to forward request to upstream service",
            );
        }
    };

    let status = response.status();
    let upstream_headers = response.headers().clone();
    let raw = match response.bytes().await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(action = %action, error = %err, "failed to read upstream response");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read response");
        }
    };

    let mut reply = raw.to_vec();
    if is_gzip(&upstream_headers) {
        reply = match gunzip(&raw) {
            Ok(decompressed) => decompressed,
            Err(err) => {
                tracing::error!(action = %action, error = %err, "failed to decompress upstream response");
                return error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to decompress response",
                );
            }
        };
    }

    // The response is shaped like the callback payload, so it is keyed by
    // the callback action name.
    if let Some(callback) = table::callback_of(action) {
        if state.transformer.has_mapping(callback) {
            match state.transformer.transform_forward(callback, &reply) {
                Ok(transformed) => reply = transformed,
                Err(err) => {
                    tracing::error!(route = %callback, error = %err, "response transformation failed");
                    return mapping_error(callback, &err);
                }
            }
        }
    }

    let mut relayed = HeaderMap::new();
    for (name, value) in &upstream_headers {
        // The body was decompressed and possibly rewritten.
        if name == HOST || name == CONTENT_ENCODING || name == CONTENT_LENGTH {
            continue;
        }
        relayed.append(name, value.clone());
    }

    (status, relayed, reply).into_response()
}

/// Webhook-correlated exchange: suspend until the callback arrives or the
/// wait times out.
async fn async_leg(
    state: AppState,
    action: &str,
    headers: &HeaderMap,
    body: &[u8],
    correlation: &Correlation,
) -> Response {
    let Correlation {
        transaction_id,
        message_id,
    } = correlation;

    if let Err(err) = state.engine.register(action, transaction_id, message_id).await {
        tracing::error!(action = %action, error = %err, "failed to register pending request");
        return error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to register pending request",
        );
    }
    let _release = ReleaseGuard::new(
        Arc::clone(&state.engine),
        action,
        transaction_id,
        message_id,
    );

    let waiter = match state.engine.subscribe(action, transaction_id, message_id).await {
        Ok(waiter) => waiter,
        Err(err) => {
            tracing::error!(action = %action, error = %err, "failed to subscribe for callback");
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to subscribe for callback",
            );
        }
    };

    // Dispatch only after the subscription is live.
    state.upstream.dispatch(action, headers, body.to_vec());

    match waiter.wait(state.wait_timeout).await {
        Ok(envelope) => {
            tracing::info!(
                action = %action,
                transaction_id = %transaction_id,
                status = envelope.status_code,
                "callback received, relaying to client"
            );
            envelope_response(envelope)
        }
        Err(EngineError::Timeout) => {
            tracing::warn!(
                action = %action,
                transaction_id = %transaction_id,
                timeout_secs = state.wait_timeout.as_secs(),
                "no callback within the wait window"
            );
            (StatusCode::REQUEST_TIMEOUT, Json(protocol::timeout_nack())).into_response()
        }
        Err(err) => {
            tracing::error!(action = %action, error = %err, "wait for callback failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed waiting for callback")
        }
    }
}

/// Relay a callback envelope to the suspended client.
fn envelope_response(envelope: CallbackEnvelope) -> Response {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::OK);

    let mut headers = HeaderMap::new();
    for (name, value) in &envelope.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        headers.append(name, value);
    }
    // The envelope body replaces whatever length the webhook carried.
    headers.remove(CONTENT_LENGTH);

    (status, headers, envelope.body).into_response()
}

fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|encoding| encoding.to_ascii_lowercase().contains("gzip"))
}

fn gunzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(raw);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

fn mapping_error(route: &str, err: &TransformError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(mapping_error_body(route, err)),
    )
        .into_response()
}
