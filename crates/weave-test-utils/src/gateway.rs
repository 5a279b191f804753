//! [`TestGateway`]: the real router served on a local socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use weave_mcp::{AppState, Dispatcher, MemoryApi, build_router};
use weave_meta::Environment;

/// A gateway listening on an ephemeral port for the lifetime of the value.
pub struct TestGateway {
    addr: SocketAddr,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestGateway {
    /// Serve a development gateway backed by `api`.
    pub async fn start(api: Arc<dyn MemoryApi>) -> Self {
        let dispatcher = Dispatcher::new(api, Duration::from_secs(30));
        Self::start_with(AppState::new(Arc::new(dispatcher), Environment::Development, "http://memory-api.test")).await
    }

    /// Serve the given application state.
    pub async fn start_with(state: AppState) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("TestGateway: failed to bind ephemeral port");
        let addr = listener.local_addr().expect("TestGateway: listener has no address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, build_router(state)).await;
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a raw body to `/mcp` and return the status and JSON reply.
    pub async fn post_raw(&self, body: impl Into<reqwest::Body>, authorization: Option<&str>) -> (u16, Value) {
        let mut request = self
            .client
            .post(self.url("/mcp"))
            .header("content-type", "application/json")
            .body(body);
        if let Some(authorization) = authorization {
            request = request.header("authorization", authorization);
        }

        let response = request.send().await.expect("TestGateway: request failed");
        let status = response.status().as_u16();
        let json = response.json().await.expect("TestGateway: reply is not JSON");
        (status, json)
    }

    /// POST a JSON-RPC request to `/mcp`.
    pub async fn post(&self, body: &Value) -> (u16, Value) {
        self.post_raw(body.to_string(), None).await
    }

    /// GET `path` and return the status and JSON reply.
    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("TestGateway: request failed");
        let status = response.status().as_u16();
        let json = response.json().await.expect("TestGateway: reply is not JSON");
        (status, json)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
