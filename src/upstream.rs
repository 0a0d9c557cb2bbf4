//! Outbound client for the upstream service.
//!
//! # Responsibilities
//! - POST action bodies to `{base_url}/{action}`
//! - Carry client headers through, minus the ones that must not proxy
//! - Fire-and-forget dispatch for the async leg
//!
//! # Design Decisions
//! - One pooled client with a 30 s request timeout
//! - Detached dispatch swallows errors: the waiter either sees a callback
//!   or times out, and "no response" vs "refused" are indistinguishable
//!   to the client anyway

use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderValue};

/// HTTP client bound to the upstream base URL.
#[derive(Clone)]
pub struct UpstreamClient {
    base_url: String,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/{}", self.base_url, action)
    }

    /// POST the body to the upstream action endpoint and return the raw
    /// response. Used by the sync leg, which relays it to the client.
    pub async fn post(
        &self,
        action: &str,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(self.action_url(action))
            .headers(outbound_headers(headers))
            .body(body)
            .send()
            .await
    }

    /// Dispatch the body on a detached task, draining and discarding the
    /// response. Failures are logged and swallowed.
    pub fn dispatch(&self, action: &str, headers: &HeaderMap, body: Vec<u8>) {
        let client = self.clone();
        let action = action.to_string();
        let headers = headers.clone();
        tokio::spawn(async move {
            match client.post(&action, &headers, body).await {
                Ok(response) => {
                    let status = response.status();
                    let _ = response.bytes().await;
                    tracing::debug!(action = %action, status = %status, "upstream dispatch completed");
                }
                Err(err) => {
                    tracing::warn!(action = %action, error = %err, "upstream dispatch failed");
                }
            }
        });
    }
}

/// Client headers as they go out to the upstream: `Host` never proxies,
/// `Content-Length` is recomputed from the (possibly rewritten) body, and
/// `Content-Type` defaults to JSON.
fn outbound_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if name == HOST || name == CONTENT_LENGTH {
            continue;
        }
        out.append(name, value.clone());
    }
    if !out.contains_key(CONTENT_TYPE) {
        out.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    out
}
