//! MCP Protocol message types
//!
//! JSON-RPC 2.0 message structures for the `call_tool` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only protocol version accepted.
pub const JSONRPC_VERSION: &str = "2.0";

/// The only method accepted.
pub const CALL_TOOL: &str = "call_tool";

/// JSON-RPC error codes used by the gateway
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Tool execution failed on the Memory API side
    pub const TOOL_EXECUTION: i32 = -32000;
}

/// JSON-RPC 2.0 Request
///
/// Fields are kept loosely typed so that a request with a wrong version or
/// method still yields a specific error rather than a parse failure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Value,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub method: Value,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Parse a request body. Only JSON objects are requests.
    pub fn parse(body: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(body).ok()? {
            Value::Object(map) => serde_json::from_value(Value::Object(map)).ok(),
            _ => None,
        }
    }

    /// Id to echo back: strings and numbers are echoed, anything else is null.
    pub fn call_id(&self) -> Value {
        match self.id {
            Value::String(_) | Value::Number(_) => self.id.clone(),
            _ => Value::Null,
        }
    }

    pub fn has_supported_version(&self) -> bool {
        self.jsonrpc.as_str() == Some(JSONRPC_VERSION)
    }

    /// Method name as shown in error messages.
    pub fn method_label(&self) -> String {
        match self.method {
            Value::String(ref s) => s.clone(),
            ref other => other.to_string(),
        }
    }

    pub fn tool_call(&self) -> ToolCallParams {
        ToolCallParams::from_params(&self.params)
    }
}

/// Tool call params
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallParams {
    /// Tool name, `None` when missing, empty or not a string
    pub name: Option<String>,
    /// Arguments, `None` when missing or not an object
    pub arguments: Option<Map<String, Value>>,
}

impl ToolCallParams {
    fn from_params(params: &Value) -> Self {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let arguments = params.get("arguments").and_then(Value::as_object).cloned();
        Self { name, arguments }
    }
}

/// JSON-RPC 2.0 Response
///
/// `id` is always serialized, as `null` when the call id is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
