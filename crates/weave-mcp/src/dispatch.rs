//! The `call_tool` dispatcher
//!
//! One inbound JSON-RPC request moves through a fixed sequence of stages:
//!
//! ```text
//! Received -> ProtocolValidated -> MethodValidated -> ToolResolved
//!          -> ArgsValidated -> BackendInvoked -> Succeeded | Failed
//! ```
//!
//! Any validation failure short-circuits to `Failed` before the Memory API is
//! touched, so a call produces at most one backend request. Every call ends
//! with exactly one [`record_outcome`] event.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use weave_meta::GatewayConfig;

use crate::backend::{AuthContext, BackendError, HttpMemoryApi, MemoryApi};
use crate::display;
use crate::protocol::{CALL_TOOL, JsonRpcRequest, JsonRpcResponse, error_codes};
use crate::tools::{self, ArgError, ToolDescriptor};
use crate::Result;

/// Last stage a call reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    ProtocolValidated,
    MethodValidated,
    ToolResolved,
    ArgsValidated,
    BackendInvoked,
    Succeeded,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::ProtocolValidated => "protocol_validated",
            Stage::MethodValidated => "method_validated",
            Stage::ToolResolved => "tool_resolved",
            Stage::ArgsValidated => "args_validated",
            Stage::BackendInvoked => "backend_invoked",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome classification recorded for every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ValidationError,
    UpstreamError,
    TransportError,
    InternalError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ValidationError => "validation_error",
            Outcome::UpstreamError => "upstream_error",
            Outcome::TransportError => "transport_error",
            Outcome::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a call failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Parse error: Invalid JSON in request body")]
    Parse,

    #[error("Invalid Request: unsupported JSON-RPC version, expected \"2.0\"")]
    InvalidProtocol,

    #[error("Method not found: {method}. Expected 'call_tool'.")]
    MethodNotFound { method: String },

    #[error("Invalid params: tool name is required")]
    MissingToolName,

    #[error("Unknown tool: {name}. Check the tool manifest (GET /mcp/manifest) for available tools.")]
    ToolNotFound { name: String },

    #[error("Invalid params for {tool}: {reason}")]
    InvalidParams { tool: &'static str, reason: ArgError },

    /// The Memory API answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream timeout: Memory API did not respond within {after:?}")]
    Timeout { after: Duration },

    /// No usable response from the Memory API.
    #[error("{message}")]
    Transport { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// JSON-RPC error code
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::Parse => error_codes::PARSE_ERROR,
            DispatchError::InvalidProtocol => error_codes::INVALID_REQUEST,
            DispatchError::MethodNotFound { .. } | DispatchError::ToolNotFound { .. } => {
                error_codes::METHOD_NOT_FOUND
            }
            DispatchError::MissingToolName | DispatchError::InvalidParams { .. } => error_codes::INVALID_PARAMS,
            DispatchError::Upstream { .. } | DispatchError::Timeout { .. } | DispatchError::Transport { .. } => {
                error_codes::TOOL_EXECUTION
            }
            DispatchError::Internal { .. } => error_codes::INTERNAL_ERROR,
        }
    }

    /// HTTP status of the response carrying this error
    pub fn http_status(&self) -> u16 {
        match self {
            DispatchError::Parse => 400,
            DispatchError::MethodNotFound { .. } | DispatchError::ToolNotFound { .. } => 404,
            _ => 500,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            DispatchError::Parse
            | DispatchError::InvalidProtocol
            | DispatchError::MethodNotFound { .. }
            | DispatchError::MissingToolName
            | DispatchError::ToolNotFound { .. }
            | DispatchError::InvalidParams { .. } => Outcome::ValidationError,
            DispatchError::Upstream { .. } => Outcome::UpstreamError,
            DispatchError::Timeout { .. } | DispatchError::Transport { .. } => Outcome::TransportError,
            DispatchError::Internal { .. } => Outcome::InternalError,
        }
    }

    fn invalid_params(tool: &ToolDescriptor, reason: ArgError) -> Self {
        DispatchError::InvalidParams { tool: tool.name, reason }
    }

    fn from_backend(err: BackendError, after: Duration) -> Self {
        match err {
            BackendError::Status { status, message } => DispatchError::Upstream {
                status,
                message: display::annotate_error(status, &message),
            },
            BackendError::Timeout => DispatchError::Timeout { after },
            BackendError::Transport(_) | BackendError::Decode(_) => DispatchError::Transport {
                message: err.to_string(),
            },
            BackendError::InvalidBaseUrl(_) => DispatchError::Internal {
                message: err.to_string(),
            },
        }
    }
}

/// Answer to one inbound call
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReply {
    pub http_status: u16,
    pub response: JsonRpcResponse,
    pub outcome: Outcome,
    /// Last stage reached before the call ended
    pub reached: Stage,
}

impl DispatchReply {
    /// Reply for an error raised outside the dispatcher, e.g. a caught panic.
    pub fn internal(message: impl Into<String>) -> Self {
        let err = DispatchError::Internal {
            message: message.into(),
        };
        Self {
            http_status: err.http_status(),
            response: JsonRpcResponse::error(Value::Null, err.code(), err.to_string()),
            outcome: err.outcome(),
            reached: Stage::Received,
        }
    }
}

/// Per-call bookkeeping for the completion record
#[derive(Debug)]
struct CallTrace {
    stage: Stage,
    call_id: Value,
    tool: Option<String>,
}

impl CallTrace {
    fn new() -> Self {
        Self {
            stage: Stage::Received,
            call_id: Value::Null,
            tool: None,
        }
    }

    fn advance(&mut self, stage: Stage) {
        self.stage = stage;
    }
}

/// Translates `call_tool` requests into Memory API calls.
///
/// Holds no per-call state; one instance is shared by all requests.
pub struct Dispatcher {
    api: Arc<dyn MemoryApi>,
    timeout: Duration,
    debug_user: Option<String>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn MemoryApi>, timeout: Duration) -> Self {
        Self {
            api,
            timeout,
            debug_user: None,
        }
    }

    /// Identity sent as `X-Debug-User`. Callers must only set this outside production.
    pub fn with_debug_user(mut self, user: Option<String>) -> Self {
        self.debug_user = user;
        self
    }

    /// Dispatcher talking HTTP to the configured Memory API.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let base_url = config.backend.base_url()?;
        let client = reqwest::Client::builder().build()?;
        let api = HttpMemoryApi::with_client(client, base_url);

        Ok(Self::new(Arc::new(api), config.backend.timeout())
            .with_debug_user(config.debug_identity().map(str::to_string)))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle one raw request body.
    ///
    /// `authorization` is the inbound `Authorization` header, forwarded as is.
    pub async fn handle(&self, body: &[u8], authorization: Option<&str>) -> DispatchReply {
        let started = Instant::now();
        let mut trace = CallTrace::new();

        let result = self.dispatch(body, authorization, &mut trace).await;
        let reached = trace.stage;

        let (reply, error) = match result {
            Ok(value) => {
                trace.advance(Stage::Succeeded);
                let reply = DispatchReply {
                    http_status: 200,
                    response: JsonRpcResponse::success(trace.call_id.clone(), value),
                    outcome: Outcome::Success,
                    reached,
                };
                (reply, None)
            }
            Err(err) => {
                trace.advance(Stage::Failed);
                let reply = DispatchReply {
                    http_status: err.http_status(),
                    response: JsonRpcResponse::error(trace.call_id.clone(), err.code(), err.to_string()),
                    outcome: err.outcome(),
                    reached,
                };
                (reply, Some(err))
            }
        };

        record_outcome(&trace, &reply, error.as_ref(), started.elapsed());
        reply
    }

    async fn dispatch(
        &self,
        body: &[u8],
        authorization: Option<&str>,
        trace: &mut CallTrace,
    ) -> std::result::Result<Value, DispatchError> {
        let request = JsonRpcRequest::parse(body).ok_or(DispatchError::Parse)?;
        trace.call_id = request.call_id();

        if !request.has_supported_version() {
            return Err(DispatchError::InvalidProtocol);
        }
        trace.advance(Stage::ProtocolValidated);

        if request.method.as_str() != Some(CALL_TOOL) {
            return Err(DispatchError::MethodNotFound {
                method: request.method_label(),
            });
        }
        trace.advance(Stage::MethodValidated);

        let params = request.tool_call();
        let name = params.name.ok_or(DispatchError::MissingToolName)?;
        trace.tool = Some(name.clone());
        let tool = tools::lookup(&name).ok_or(DispatchError::ToolNotFound { name })?;
        trace.advance(Stage::ToolResolved);

        let arguments = params
            .arguments
            .ok_or_else(|| DispatchError::invalid_params(tool, ArgError::ArgumentsRequired))?;
        tool.validate(&arguments)
            .map_err(|reason| DispatchError::invalid_params(tool, reason))?;
        let call = tool
            .route
            .build(&arguments)
            .map_err(|reason| DispatchError::invalid_params(tool, reason))?;
        trace.advance(Stage::ArgsValidated);

        let auth = AuthContext {
            authorization: authorization.map(str::to_string),
            debug_user: self.debug_user.clone(),
        };

        trace.advance(Stage::BackendInvoked);
        let raw = match tokio::time::timeout(self.timeout, self.api.send(&call, &auth)).await {
            Ok(result) => result.map_err(|e| DispatchError::from_backend(e, self.timeout))?,
            Err(_) => return Err(DispatchError::Timeout { after: self.timeout }),
        };

        Ok(display::decorate(tool, raw))
    }
}

/// The single completion record of a call.
fn record_outcome(trace: &CallTrace, reply: &DispatchReply, error: Option<&DispatchError>, elapsed: Duration) {
    let tool = trace.tool.as_deref().unwrap_or("-");
    let elapsed_ms = elapsed.as_millis() as u64;
    let call_id = &trace.call_id;

    match error {
        None => tracing::info!(
            tool,
            %call_id,
            elapsed_ms,
            stage = %trace.stage,
            outcome = %reply.outcome,
            "Tool call succeeded"
        ),
        Some(err) if reply.outcome == Outcome::ValidationError => tracing::warn!(
            tool,
            %call_id,
            elapsed_ms,
            stage = %trace.stage,
            outcome = %reply.outcome,
            reached = %reply.reached,
            code = err.code(),
            error = %err,
            "Tool call rejected"
        ),
        Some(err) => tracing::error!(
            tool,
            %call_id,
            elapsed_ms,
            stage = %trace.stage,
            outcome = %reply.outcome,
            reached = %reply.reached,
            code = err.code(),
            error = %err,
            "Tool call failed"
        ),
    }
}
