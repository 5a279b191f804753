//! Shared test utilities for the weave-mcp workspace.
//!
//! This crate provides test doubles and fixtures shared by the crate test
//! suites and the integration tests. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`recording`] - in-process [`RecordingMemoryApi`] that records every call
//! - [`memory_api`] - [`MockMemoryApi`], a wiremock server standing in for the Memory API
//! - [`gateway`] - [`TestGateway`], the real router served on a local socket
//! - [`config`] - [`TestConfigDir`] for configuration file scenarios

pub mod config;
pub mod gateway;
pub mod memory_api;
pub mod recording;

pub use config::TestConfigDir;
pub use gateway::TestGateway;
pub use memory_api::MockMemoryApi;
pub use recording::{RecordedCall, RecordingMemoryApi};

use serde_json::{Value, json};

/// Body of a `call_tool` request.
pub fn call_tool_body(name: &str, arguments: Value, id: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "call_tool",
        "params": {"name": name, "arguments": arguments},
        "id": id,
    })
}
