//! Configuration management for the Weave MCP gateway.
//!
//! This crate provides the gateway configuration types and a layered
//! resolver that merges defaults, TOML files and environment overrides.

pub mod config;
pub mod error;
pub mod resolver;

pub use config::{BackendConfig, ConfigLayer, Environment, GatewayConfig, RuntimeConfig, ServerConfig};
pub use error::{Error, Result};
pub use resolver::ConfigResolver;
