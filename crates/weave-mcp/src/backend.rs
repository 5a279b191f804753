//! Memory API client
//!
//! Every validated tool call becomes exactly one [`BackendCall`]. The
//! [`MemoryApi`] trait is the seam between the dispatcher and the network:
//! [`HttpMemoryApi`] talks to the real service over `reqwest`, tests plug in
//! in-process doubles.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Header carrying the debug identity outside production.
pub const DEBUG_USER_HEADER: &str = "X-Debug-User";

/// HTTP verb of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
}

impl From<Verb> for reqwest::Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Get => write!(f, "GET"),
            Verb::Post => write!(f, "POST"),
            Verb::Put => write!(f, "PUT"),
        }
    }
}

/// One request to the Memory API
#[derive(Debug, Clone, PartialEq)]
pub struct BackendCall {
    pub verb: Verb,
    /// Unencoded path segments, e.g. `["v1", "memories", "m1", "core"]`
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendCall {
    pub fn new<I, S>(verb: Verb, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verb,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Unencoded path, for logs and assertions.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Resolve against the API base URL, percent-encoding every segment and
    /// query value. A path on the base URL is kept as a prefix.
    pub fn url(&self, base: &Url) -> Result<Url, BackendError> {
        let mut url = base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| BackendError::InvalidBaseUrl(base.to_string()))?;
            path.pop_if_empty();
            path.extend(&self.segments);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

/// Credentials forwarded with an outbound call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// Inbound `Authorization` header, passed through unchanged
    pub authorization: Option<String>,
    /// Debug identity, only ever set outside production
    pub debug_user: Option<String>,
}

/// Failure talking to the Memory API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The API answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The API did not answer in time.
    #[error("Memory API request timed out")]
    Timeout,

    /// The request never produced a response.
    #[error("Memory API unreachable: {0}")]
    Transport(String),

    /// A success response whose body is not JSON.
    #[error("Memory API returned an unreadable response: {0}")]
    Decode(String),

    #[error("invalid Memory API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl BackendError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// The Memory API as seen by the dispatcher.
#[async_trait]
pub trait MemoryApi: Send + Sync {
    /// Perform one call and return the decoded JSON body.
    async fn send(&self, call: &BackendCall, auth: &AuthContext) -> Result<Value, BackendError>;
}

/// [`MemoryApi`] over HTTP
pub struct HttpMemoryApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMemoryApi {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl MemoryApi for HttpMemoryApi {
    async fn send(&self, call: &BackendCall, auth: &AuthContext) -> Result<Value, BackendError> {
        let url = call.url(&self.base_url)?;
        tracing::debug!(verb = %call.verb, path = %call.path(), "Memory API call");

        let mut request = self
            .client
            .request(call.verb.into(), url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(ref authorization) = auth.authorization {
            request = request.header(AUTHORIZATION, authorization.as_str());
        }
        if let Some(ref user) = auth.debug_user {
            request = request.header(DEBUG_USER_HEADER, user.as_str());
        }
        if let Some(ref body) = call.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(BackendError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(BackendError::from_reqwest)?;

        if !status.is_success() {
            let message = error_message(status, &text);
            tracing::debug!(status = status.as_u16(), path = %call.path(), error = %message, "Memory API returned error");
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(status = status.as_u16(), path = %call.path(), "Memory API success");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Human-readable message for a failed response.
///
/// Prefers the structured `detail` (a string, or the `msg` entries of a
/// validation error list) or `message` field of a JSON body, then the raw
/// body text, then a generic `API error (<status>): <reason>`.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let generic = || {
        format!(
            "API error ({}): {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    };

    match serde_json::from_str::<Value>(body) {
        Ok(json) => structured_detail(&json).unwrap_or_else(generic),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => generic(),
    }
}

fn structured_detail(json: &Value) -> Option<String> {
    match json.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => return Some(detail.clone()),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    json.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
