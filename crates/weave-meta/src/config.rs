//! Configuration types for the Weave MCP gateway
//!
//! The effective configuration is a [`GatewayConfig`]. Every source that can
//! contribute to it (TOML files, the process environment, CLI flags) is first
//! expressed as a [`ConfigLayer`] of optional values and then applied on top
//! of the defaults in order.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default address the gateway listens on.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default location of the Memory API.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Default upper bound for a single Memory API round trip.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest accepted Memory API timeout.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Deployment environment.
///
/// Outside production the gateway may inject a debug identity header on
/// outbound calls and exposes its status page on `GET /mcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" | "test" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(Error::InvalidEnvironment {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:3000`
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl ServerConfig {
    /// Parse the bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind.parse().map_err(|e| Error::InvalidValue {
            key: "server.bind".to_string(),
            message: format!("{e}: {}", self.bind),
        })
    }
}

/// Memory API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL every tool endpoint is resolved against
    pub base_url: String,
    /// Upper bound for one backend round trip, in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse the base URL, requiring an http(s) scheme and a host.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| Error::InvalidValue {
            key: "backend.base_url".to_string(),
            message: format!("{e}: {}", self.base_url),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::InvalidValue {
                key: "backend.base_url".to_string(),
                message: format!("expected an http(s) URL, got {}", self.base_url),
            });
        }

        Ok(url)
    }
}

/// Runtime behaviour settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub environment: Environment,
    /// Identity sent as `X-Debug-User` on outbound calls outside production
    #[serde(default)]
    pub debug_user: Option<String>,
    /// Enables debug-level logging
    #[serde(default)]
    pub verbose: bool,
}

/// Effective gateway configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl GatewayConfig {
    /// Apply a layer on top of this configuration. Only values present in
    /// the layer are overwritten.
    pub fn apply(&mut self, layer: &ConfigLayer) {
        if let Some(ref bind) = layer.server.bind {
            self.server.bind = bind.clone();
        }
        if let Some(ref base_url) = layer.backend.base_url {
            self.backend.base_url = base_url.clone();
        }
        if let Some(timeout_secs) = layer.backend.timeout_secs {
            self.backend.timeout_secs = timeout_secs;
        }
        if let Some(environment) = layer.runtime.environment {
            self.runtime.environment = environment;
        }
        if let Some(ref debug_user) = layer.runtime.debug_user {
            self.runtime.debug_user = Some(debug_user.clone());
        }
        if let Some(verbose) = layer.runtime.verbose {
            self.runtime.verbose = verbose;
        }
    }

    /// Check every value that can only be validated as a whole.
    pub fn validate(&self) -> Result<()> {
        self.server.bind_addr()?;
        self.backend.base_url()?;

        if self.backend.timeout_secs == 0 || self.backend.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::InvalidValue {
                key: "backend.timeout_secs".to_string(),
                message: format!(
                    "must be between 1 and {MAX_TIMEOUT_SECS}, got {}",
                    self.backend.timeout_secs
                ),
            });
        }

        Ok(())
    }

    /// Debug identity to inject on outbound calls, if any.
    ///
    /// Always `None` in production.
    pub fn debug_identity(&self) -> Option<&str> {
        if self.runtime.environment.is_production() {
            return None;
        }
        self.runtime
            .debug_user
            .as_deref()
            .filter(|user| !user.trim().is_empty())
    }
}

/// A partial configuration from a single source.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub server: ServerLayer,
    #[serde(default)]
    pub backend: BackendLayer,
    #[serde(default)]
    pub runtime: RuntimeLayer,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerLayer {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendLayer {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeLayer {
    pub environment: Option<Environment>,
    pub debug_user: Option<String>,
    pub verbose: Option<bool>,
}

/// Environment variables read by [`ConfigLayer::from_env`].
pub mod env_keys {
    pub const API_BASE: &str = "WEAVE_API_BASE";
    pub const API_TIMEOUT_SECS: &str = "WEAVE_API_TIMEOUT_SECS";
    pub const BIND: &str = "WEAVE_BIND";
    pub const ENVIRONMENT: &str = "WEAVE_ENV";
    pub const DEBUG_USER: &str = "WEAVE_DEBUG_USER";
    pub const MCP_DEBUG: &str = "WEAVE_MCP_DEBUG";
}

impl ConfigLayer {
    /// Parse a layer from TOML text.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Build a layer from environment variables.
    ///
    /// `lookup` returns the value of a variable, or `None` when unset.
    /// Empty values are treated as unset.
    pub fn from_env<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut layer = ConfigLayer::default();

        layer.backend.base_url = get(env_keys::API_BASE);
        layer.server.bind = get(env_keys::BIND);
        layer.runtime.debug_user = get(env_keys::DEBUG_USER);

        if let Some(raw) = get(env_keys::API_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|e| Error::InvalidValue {
                key: env_keys::API_TIMEOUT_SECS.to_string(),
                message: format!("{e}: {raw}"),
            })?;
            layer.backend.timeout_secs = Some(secs);
        }

        if let Some(raw) = get(env_keys::ENVIRONMENT) {
            layer.runtime.environment = Some(raw.parse()?);
        }

        if let Some(raw) = get(env_keys::MCP_DEBUG) {
            layer.runtime.verbose = Some(matches!(
                raw.trim().to_lowercase().as_str(),
                "true" | "1" | "yes"
            ));
        }

        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.runtime.environment, Environment::Development);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case("development", Environment::Development)]
    #[case("dev", Environment::Development)]
    #[case("Production", Environment::Production)]
    #[case("prod", Environment::Production)]
    fn environment_from_str(#[case] input: &str, #[case] expected: Environment) {
        assert_eq!(input.parse::<Environment>().unwrap(), expected);
    }

    #[test]
    fn environment_rejects_unknown() {
        assert!("staging-ish".parse::<Environment>().is_err());
    }

    #[test]
    fn apply_only_overrides_present_values() {
        let mut config = GatewayConfig::default();
        let layer = ConfigLayer::parse(
            r#"
[backend]
timeout_secs = 5
"#,
        )
        .unwrap();

        config.apply(&layer);

        assert_eq!(config.backend.timeout_secs, 5);
        assert_eq!(config.backend.base_url, DEFAULT_API_BASE);
        assert_eq!(config.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let result = ConfigLayer::parse("[backend]\nbase = \"http://x\"\n");
        assert!(result.is_err());
    }

    #[rstest]
    #[case("ftp://files.example.com")]
    #[case("not a url")]
    #[case("file:///tmp/api")]
    fn validate_rejects_non_http_base_url(#[case] base_url: &str) {
        let mut config = GatewayConfig::default();
        config.backend.base_url = base_url.to_string();
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(0)]
    #[case(301)]
    fn validate_rejects_out_of_range_timeout(#[case] secs: u64) {
        let mut config = GatewayConfig::default();
        config.backend.timeout_secs = secs;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend.timeout_secs"));
    }

    #[test]
    fn validate_rejects_bad_bind() {
        let mut config = GatewayConfig::default();
        config.server.bind = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_identity_is_suppressed_in_production() {
        let mut config = GatewayConfig::default();
        config.runtime.debug_user = Some("7f1c".to_string());
        assert_eq!(config.debug_identity(), Some("7f1c"));

        config.runtime.environment = Environment::Production;
        assert_eq!(config.debug_identity(), None);
    }

    #[test]
    fn debug_identity_ignores_blank_user() {
        let mut config = GatewayConfig::default();
        config.runtime.debug_user = Some("  ".to_string());
        assert_eq!(config.debug_identity(), None);
    }

    #[test]
    fn from_env_reads_all_keys() {
        let layer = ConfigLayer::from_env(env_of(&[
            ("WEAVE_API_BASE", "http://api.internal:9000"),
            ("WEAVE_API_TIMEOUT_SECS", "12"),
            ("WEAVE_BIND", "0.0.0.0:8080"),
            ("WEAVE_ENV", "production"),
            ("WEAVE_DEBUG_USER", "debug-user"),
            ("WEAVE_MCP_DEBUG", "true"),
        ]))
        .unwrap();

        assert_eq!(layer.backend.base_url.as_deref(), Some("http://api.internal:9000"));
        assert_eq!(layer.backend.timeout_secs, Some(12));
        assert_eq!(layer.server.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(layer.runtime.environment, Some(Environment::Production));
        assert_eq!(layer.runtime.debug_user.as_deref(), Some("debug-user"));
        assert_eq!(layer.runtime.verbose, Some(true));
    }

    #[test]
    fn from_env_treats_empty_as_unset() {
        let layer = ConfigLayer::from_env(env_of(&[("WEAVE_API_BASE", "")])).unwrap();
        assert_eq!(layer, ConfigLayer::default());
    }

    #[test]
    fn from_env_rejects_bad_timeout() {
        let err = ConfigLayer::from_env(env_of(&[("WEAVE_API_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("WEAVE_API_TIMEOUT_SECS"));
    }
}
