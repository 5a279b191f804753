//! MCP gateway for the Weave Memory API
//!
//! This crate receives MCP-style JSON-RPC `call_tool` requests from a chat
//! client, validates them against a static tool registry, and forwards each
//! valid call as exactly one REST request to the Memory API.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client (chat agent) ]
//!        | (JSON-RPC over HTTP)
//!        v
//! [ weave-mcp (Dispatcher) ]
//!        | (REST + JSON)
//!        v
//! [ Memory API ]
//! ```
//!
//! # Tools
//!
//! See [`tools::TOOLS`] for the registry, or `GET /mcp/manifest` on a
//! running gateway.

pub mod backend;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use backend::{AuthContext, BackendCall, BackendError, HttpMemoryApi, MemoryApi, Verb};
pub use dispatch::{DispatchError, DispatchReply, Dispatcher, Outcome, Stage};
pub use error::{Error, Result};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{AppState, build_router, serve};
pub use tools::{ManifestEntry, ToolDescriptor};
