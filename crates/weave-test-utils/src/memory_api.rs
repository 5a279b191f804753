//! [`MockMemoryApi`]: a wiremock server standing in for the Memory API.

use serde_json::Value;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A running mock Memory API.
///
/// Each `mount_*` helper expects the route to be hit exactly once, so a
/// dropped or duplicated backend call fails the test when the server is
/// dropped.
pub struct MockMemoryApi {
    server: MockServer,
}

impl MockMemoryApi {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&self.server.uri()).expect("MockMemoryApi: wiremock URI is a valid URL")
    }

    /// Answer `verb path` once with a JSON body.
    pub async fn mount_json(&self, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answer `verb path` once with a plain text body.
    pub async fn mount_text(&self, verb: &str, route: &str, status: u16, body: &str) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// The only request received, parsed back into its parts.
    ///
    /// # Panics
    /// Panics unless exactly one request was received.
    pub async fn single_request(&self) -> wiremock::Request {
        let mut requests = self
            .server
            .received_requests()
            .await
            .expect("MockMemoryApi: request recording is enabled");
        assert_eq!(requests.len(), 1, "Expected exactly one Memory API request");
        requests.remove(0)
    }
}
