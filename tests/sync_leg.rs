//! End-to-end tests for the direct-response (sync) leg.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};

use bap_bridge::storage::Store;
use bap_bridge::transform::{
    MappingConfig, RouteTemplates, TemplateEvaluator, Transformer, TransformErrorKind,
};

mod common;

fn search_body() -> Value {
    json!({
        "context": {"transaction_id": "t-sync", "message_id": "m-sync"},
        "message": {"intent": {"item": "tea"}}
    })
}

/// Evaluator that wraps the input under a template-named tag, or fails
/// when the template is `fail`.
struct TagEvaluator;

impl TemplateEvaluator for TagEvaluator {
    fn evaluate(&self, template: &str, input: &[u8]) -> Result<Vec<u8>, TransformErrorKind> {
        if template == "fail" {
            return Err(TransformErrorKind::Evaluate("forced failure".into()));
        }
        let original: Value = serde_json::from_slice(input)
            .map_err(|err| TransformErrorKind::ParseInput(err.to_string()))?;
        Ok(serde_json::to_vec(&json!({"tag": template, "original": original})).unwrap())
    }
}

fn tagged_transformer(routes: &[(&str, &str)]) -> Transformer {
    let mappings = routes
        .iter()
        .map(|(route, template)| {
            (
                route.to_string(),
                RouteTemplates {
                    forward: Some(template.to_string()),
                    reverse: None,
                },
            )
        })
        .collect::<HashMap<_, _>>();
    Transformer::new(MappingConfig { mappings }, Arc::new(TagEvaluator))
}

#[tokio::test]
async fn search_passes_through_without_mappings() {
    let (upstream, upstream_log) = common::start_mock_upstream(200, r#"{"catalog":[1,2,3]}"#).await;
    let facade = common::spawn_facade(&format!("http://{upstream}"), Duration::from_secs(1)).await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/search"))
        .json(&search_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"catalog": [1, 2, 3]}));

    let seen = upstream_log.take();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].action, "search");
    let forwarded: Value = serde_json::from_slice(&seen[0].body).unwrap();
    assert_eq!(forwarded, search_body());

    // The sync leg never creates a pending slot.
    assert!(facade.store.keys("Sync#*").await.unwrap().is_empty());
}

#[tokio::test]
async fn upstream_response_headers_are_relayed() {
    let router = Router::new().route(
        "/search",
        post(|| async {
            (
                [("x-upstream", "yes"), ("content-type", "application/json")],
                r#"{"ok":true}"#,
            )
        }),
    );
    let upstream = common::spawn_server(router).await;
    let facade = common::spawn_facade(&format!("http://{upstream}"), Duration::from_secs(1)).await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/search"))
        .json(&search_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");
}

#[tokio::test]
async fn gzip_responses_are_decompressed_before_relay() {
    let router = Router::new().route(
        "/discover",
        post(|| async {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(br#"{"compressed":true}"#).unwrap();
            let body = encoder.finish().unwrap();

            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_ENCODING, "gzip".parse().unwrap());
            (headers, body).into_response()
        }),
    );
    let upstream = common::spawn_server(router).await;
    let facade = common::spawn_facade(&format!("http://{upstream}"), Duration::from_secs(1)).await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/discover"))
        .json(&json!({
            "context": {"transaction_id": "t-gz", "message_id": "m-gz"},
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"compressed": true}));
}

#[tokio::test]
async fn transforms_apply_on_both_sides_of_the_exchange() {
    let (upstream, upstream_log) = common::start_mock_upstream(200, r#"{"catalog":[]}"#).await;
    let facade = common::spawn_facade_with(
        &format!("http://{upstream}"),
        tagged_transformer(&[("search", "req-template"), ("on_search", "resp-template")]),
        Duration::from_secs(1),
    )
    .await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/search"))
        .json(&search_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"tag": "resp-template", "original": {"catalog": []}})
    );

    let seen = upstream_log.take();
    let forwarded: Value = serde_json::from_slice(&seen[0].body).unwrap();
    assert_eq!(
        forwarded,
        json!({"tag": "req-template", "original": search_body()})
    );
}

#[tokio::test]
async fn failing_response_transform_names_the_callback_route() {
    let (upstream, _log) = common::start_mock_upstream(200, r#"{"catalog":[]}"#).await;
    let facade = common::spawn_facade_with(
        &format!("http://{upstream}"),
        tagged_transformer(&[("on_search", "fail")]),
        Duration::from_secs(1),
    )
    .await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/search"))
        .json(&search_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["mappingError"]["route"], "on_search");
    assert_eq!(body["mappingError"]["direction"], "forward");
}

#[tokio::test]
async fn failing_request_transform_names_the_forward_route() {
    let (upstream, upstream_log) = common::start_mock_upstream(200, "{}").await;
    let facade = common::spawn_facade_with(
        &format!("http://{upstream}"),
        tagged_transformer(&[("search", "fail")]),
        Duration::from_secs(1),
    )
    .await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/search"))
        .json(&search_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["mappingError"]["route"], "search");

    // The upstream was never contacted.
    assert_eq!(upstream_log.len(), 0);
}

#[tokio::test]
async fn unreachable_upstream_is_a_bad_gateway() {
    // Bind a port, then drop it so connections are refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let facade = common::spawn_facade(&format!("http://{dead_addr}"), Duration::from_secs(1)).await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/search"))
        .json(&search_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY.as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"error": "Failed to forward request to upstream service"})
    );
}

#[tokio::test]
async fn upstream_error_statuses_are_relayed_verbatim() {
    let (upstream, _log) = common::start_mock_upstream(503, r#"{"unavailable":true}"#).await;
    let facade = common::spawn_facade(&format!("http://{upstream}"), Duration::from_secs(1)).await;

    let response = reqwest::Client::new()
        .post(facade.url("/api/search"))
        .json(&search_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"unavailable": true}));
}
