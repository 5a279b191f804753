//! End-to-end tests for the gateway
//!
//! These exercise the complete flow over real sockets:
//! HTTP client -> gateway router -> dispatcher -> HttpMemoryApi -> mock Memory API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use weave_mcp::{AppState, Dispatcher, HttpMemoryApi};
use weave_meta::Environment;
use weave_test_utils::{MockMemoryApi, RecordingMemoryApi, TestGateway, call_tool_body};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

/// A development gateway forwarding to `mock` over HTTP.
async fn gateway_for(mock: &MockMemoryApi) -> TestGateway {
    let api = HttpMemoryApi::new(mock.base_url());
    let dispatcher = Dispatcher::new(Arc::new(api), std::time::Duration::from_secs(30));
    TestGateway::start_with(AppState::new(Arc::new(dispatcher), Environment::Development, mock.uri())).await
}

// ==========================================================================
// Scenarios
// ==========================================================================

#[tokio::test]
async fn create_memory_end_to_end() {
    let mock = MockMemoryApi::start().await;
    mock.mount_json("POST", "/v1/memories", 201, json!({"memory_id": "m1", "title": "Trip"}))
        .await;
    let gateway = gateway_for(&mock).await;

    let (status, reply) = gateway
        .post(&call_tool_body("create_memory", json!({"title": "Trip"}), json!(1)))
        .await;

    assert_eq!(status, 200);
    assert_eq!(reply["jsonrpc"], "2.0");
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["result"]["memory_id"], "m1");
    assert_eq!(reply["result"]["title"], "Trip");
    assert!(reply["result"]["_display"].is_object());

    let request = mock.single_request().await;
    let sent: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(sent, json!({"title": "Trip"}));
}

#[tokio::test]
async fn invalid_params_never_reach_the_memory_api() {
    let mock = MockMemoryApi::start().await;
    let gateway = gateway_for(&mock).await;

    let (status, reply) = gateway
        .post(&call_tool_body("lock_core", json!({}), json!(2)))
        .await;

    assert_eq!(status, 500);
    assert_eq!(reply["id"], 2);
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn not_found_suggests_search() {
    let mock = MockMemoryApi::start().await;
    mock.mount_json("PUT", "/v1/memories/x/core", 404, json!({"detail": "Memory not found"}))
        .await;
    let gateway = gateway_for(&mock).await;

    let (status, reply) = gateway
        .post(&call_tool_body("set_core", json!({"memory_id": "x", "narrative": "n"}), json!(3)))
        .await;

    assert_eq!(status, 500);
    assert_eq!(reply["error"]["code"], -32000);
    let message = reply["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Memory not found"), "got: {message}");
    assert!(message.contains("search_associative"), "got: {message}");
}

#[tokio::test]
async fn image_layer_is_forwarded_once() {
    let mock = MockMemoryApi::start().await;
    mock.mount_json(
        "POST",
        "/v1/memories/m1/layers",
        201,
        json!({"layer_id": "l1", "kind": "IMAGE"}),
    )
    .await;
    let gateway = gateway_for(&mock).await;

    let (status, reply) = gateway
        .post(&call_tool_body(
            "append_layer",
            json!({"memory_id": "m1", "kind": "IMAGE", "artifact_id": "a1"}),
            json!("layer-1"),
        ))
        .await;

    assert_eq!(status, 200);
    assert_eq!(reply["id"], "layer-1");
    assert_eq!(reply["result"]["layer_id"], "l1");
}

#[tokio::test]
async fn memory_id_is_percent_encoded_in_path() {
    let mock = MockMemoryApi::start().await;
    mock.mount_json("POST", "/v1/memories/a%2Fb/lock", 200, json!({"memory_id": "a/b", "version": 1}))
        .await;
    let gateway = gateway_for(&mock).await;

    let (status, reply) = gateway
        .post(&call_tool_body("lock_core", json!({"memory_id": "a/b"}), json!(4)))
        .await;

    assert_eq!(status, 200);
    assert_eq!(reply["result"]["_display"]["message"], "Core locked successfully (version 1)");
}

#[tokio::test]
async fn bearer_token_passes_through_unchanged() {
    let mock = MockMemoryApi::start().await;
    mock.mount_json("GET", "/v1/search/associative", 200, json!({"results": [{"memory_id": "m1"}]}))
        .await;
    let gateway = gateway_for(&mock).await;

    let body = call_tool_body("search_associative", json!({"query": "beach", "limit": 3}), json!(5));
    let (status, reply) = gateway.post_raw(body.to_string(), Some("Bearer secret-token")).await;

    assert_eq!(status, 200);
    assert_eq!(reply["result"]["_display"]["count"], 1);

    let request = mock.single_request().await;
    assert_eq!(
        request.headers.get("authorization").and_then(|v| v.to_str().ok()),
        Some("Bearer secret-token")
    );
    assert_eq!(request.url.query(), Some("q=beach&limit=3"));
}

#[tokio::test]
async fn undecodable_success_body_is_tool_execution_error() {
    let mock = MockMemoryApi::start().await;
    let gateway = gateway_for(&mock).await;
    Mock::given(method("POST"))
        .and(path("/v1/weaves"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(mock.server())
        .await;

    let (status, reply) = gateway
        .post(&call_tool_body(
            "weave",
            json!({"from_memory_id": "a", "to_memory_id": "b"}),
            json!(6),
        ))
        .await;

    assert_eq!(status, 500);
    assert_eq!(reply["error"]["code"], -32000);
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let mock = MockMemoryApi::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/invites"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"invite_id": "i1", "token": "t"})))
        .expect(10)
        .mount(mock.server())
        .await;
    let gateway = gateway_for(&mock).await;

    let bodies: Vec<Value> = (0..10)
        .map(|i| call_tool_body("invite", json!({"email": format!("u{i}@example.com"), "role": "VIEWER"}), json!(i)))
        .collect();
    let replies = futures::future::join_all(bodies.iter().map(|body| gateway.post(body))).await;

    for (i, (status, reply)) in replies.into_iter().enumerate() {
        assert_eq!(status, 200);
        assert_eq!(reply["id"], i);
        assert_eq!(reply["result"]["invite_id"], "i1");
    }
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let mock = MockMemoryApi::start().await;
    let gateway = gateway_for(&mock).await;

    let (status, reply) = gateway.post_raw("{\"jsonrpc\": ", None).await;

    assert_eq!(status, 400);
    assert_eq!(reply["id"], Value::Null);
    assert_eq!(reply["error"]["code"], -32700);
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn each_request_makes_at_most_one_backend_call() {
    let api = RecordingMemoryApi::new()
        .respond_with(json!({"weave_id": "w1"}))
        .shared();
    let gateway = TestGateway::start(api.clone()).await;

    let valid = call_tool_body("weave", json!({"from_memory_id": "a", "to_memory_id": "b"}), json!(1));
    let invalid = call_tool_body("weave", json!({"from_memory_id": "a"}), json!(2));

    let (status, reply) = gateway.post(&valid).await;
    assert_eq!(status, 200);
    assert_eq!(reply["result"]["_display"]["relation"], "relates_to");

    let (status, _) = gateway.post(&invalid).await;
    assert_eq!(status, 500);

    let recorded = api.single_call();
    assert_eq!(recorded.call.path(), "/v1/weaves");
    assert_eq!(recorded.auth.debug_user, None);
}
