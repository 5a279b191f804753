//! Configuration driven gateway tests
//!
//! The gateway is built from resolved configuration, as the binary does, and
//! checked for the behaviour each setting controls.

use pretty_assertions::assert_eq;
use serde_json::json;
use weave_mcp::AppState;
use weave_test_utils::{MockMemoryApi, TestConfigDir, TestGateway, call_tool_body};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn config_file(api_base: &str, environment: &str, timeout_secs: u64) -> String {
    format!(
        r#"
[backend]
base_url = "{api_base}"
timeout_secs = {timeout_secs}

[runtime]
environment = "{environment}"
debug_user = "dev@example.com"
"#
    )
}

async fn lock_core(gateway: &TestGateway) -> (u16, serde_json::Value) {
    gateway
        .post(&call_tool_body("lock_core", json!({"memory_id": "m1"}), json!(1)))
        .await
}

#[tokio::test]
async fn debug_user_is_injected_in_development() {
    let mock = MockMemoryApi::start().await;
    mock.mount_json("POST", "/v1/memories/m1/lock", 200, json!({"memory_id": "m1"}))
        .await;

    let dir = TestConfigDir::new();
    let explicit = dir.write("weave.toml", &config_file(&mock.uri(), "development", 30));
    let config = dir
        .resolver()
        .with_config_file(explicit)
        .resolve_with_env(|_| None)
        .unwrap();

    let gateway = TestGateway::start_with(AppState::from_config(&config).unwrap()).await;
    let (status, _) = lock_core(&gateway).await;

    assert_eq!(status, 200);
    let request = mock.single_request().await;
    assert_eq!(
        request.headers.get("x-debug-user").and_then(|v| v.to_str().ok()),
        Some("dev@example.com")
    );
}

#[tokio::test]
async fn debug_user_is_never_sent_in_production() {
    let mock = MockMemoryApi::start().await;
    mock.mount_json("POST", "/v1/memories/m1/lock", 200, json!({"memory_id": "m1"}))
        .await;

    let dir = TestConfigDir::new();
    dir.write_global(&config_file(&mock.uri(), "development", 30));
    let config = dir
        .resolver()
        .resolve_with_env(|key| (key == "WEAVE_ENV").then(|| "production".to_string()))
        .unwrap();

    let gateway = TestGateway::start_with(AppState::from_config(&config).unwrap()).await;
    let (status, _) = lock_core(&gateway).await;

    assert_eq!(status, 200);
    let request = mock.single_request().await;
    assert!(request.headers.get("x-debug-user").is_none());

    let (status, body) = gateway.get("/mcp").await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({"error": "Not Found"}));
}

#[tokio::test]
async fn configured_timeout_bounds_the_backend_call() {
    let mock = MockMemoryApi::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/memories/m1/lock"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"memory_id": "m1"}))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .expect(1)
        .mount(mock.server())
        .await;

    let dir = TestConfigDir::new();
    dir.write_global(&config_file(&mock.uri(), "development", 1));
    let config = dir.resolver().resolve_with_env(|_| None).unwrap();

    let gateway = TestGateway::start_with(AppState::from_config(&config).unwrap()).await;
    let (status, reply) = lock_core(&gateway).await;

    assert_eq!(status, 500);
    assert_eq!(reply["error"]["code"], -32000);
    assert!(
        reply["error"]["message"].as_str().unwrap().contains("timeout"),
        "got: {reply}"
    );
}

#[tokio::test]
async fn status_reports_configured_memory_api() {
    let dir = TestConfigDir::new();
    let config = dir
        .resolver()
        .resolve_with_env(|key| (key == "WEAVE_API_BASE").then(|| "http://memory.internal:9000".to_string()))
        .unwrap();

    let gateway = TestGateway::start_with(AppState::from_config(&config).unwrap()).await;
    let (status, body) = gateway.get("/mcp").await;

    assert_eq!(status, 200);
    assert_eq!(body["memory_api"], "http://memory.internal:9000");
    assert_eq!(body["tools_available"].as_array().unwrap().len(), 8);
}
