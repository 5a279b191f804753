//! Configuration resolution with layered overrides
//!
//! The `ConfigResolver` loads and merges configuration from multiple sources
//! in a defined hierarchy, with later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Global config (`<config_dir>/weave-mcp/config.toml`)
//! 3. Explicit config file (`--config <path>`)
//! 4. Environment variables (`WEAVE_*`)
//! 5. Command-line overrides (`--bind`, `--api-base`, `--verbose`)
//!
//! Validation runs once, on the fully merged result.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConfigLayer, GatewayConfig};
use crate::{Error, Result};

/// Resolves the effective [`GatewayConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    /// Config file named on the command line. Must exist when set.
    explicit_path: Option<PathBuf>,

    /// Override for the global config directory (used for testing).
    /// When `None`, the platform-appropriate directory is used via `dirs::config_dir()`.
    global_config_dir_override: Option<PathBuf>,

    /// Flags given on the command line, applied last.
    overrides: Option<ConfigLayer>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit config file as layer 3.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Use a custom global config directory instead of the platform one.
    pub fn with_global_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_config_dir_override = Some(dir.into());
        self
    }

    /// Apply `layer` on top of every other source as layer 5.
    pub fn with_overrides(mut self, layer: ConfigLayer) -> Self {
        self.overrides = Some(layer);
        self
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("weave-mcp"))
    }

    /// Resolve against the real process environment.
    pub fn resolve(&self) -> Result<GatewayConfig> {
        self.resolve_with_env(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for environment variables.
    ///
    /// Missing file layers are skipped, except an explicit config file which
    /// must exist. Invalid TOML in any layer is an error. Values are only
    /// validated after the command-line layer, so a flag can replace a bad
    /// value from a file or the environment.
    pub fn resolve_with_env<F>(&self, lookup: F) -> Result<GatewayConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = GatewayConfig::default();

        // Layer 2 - Global config
        if let Some(global_dir) = self.global_config_dir() {
            let global_config_path = global_dir.join("config.toml");
            if global_config_path.is_file() {
                tracing::debug!(?global_config_path, "Loading global config (layer 2)");
                config.apply(&load_layer(&global_config_path)?);
            } else {
                tracing::debug!(?global_config_path, "No global config found (layer 2), skipping");
            }
        }

        // Layer 3 - Explicit config file
        if let Some(ref path) = self.explicit_path {
            if !path.is_file() {
                return Err(Error::ConfigNotFound { path: path.clone() });
            }
            tracing::debug!(config_path = ?path, "Loading config file (layer 3)");
            config.apply(&load_layer(path)?);
        }

        // Layer 4 - Environment
        config.apply(&ConfigLayer::from_env(lookup)?);

        // Layer 5 - Command line
        if let Some(ref overrides) = self.overrides {
            tracing::debug!(?overrides, "Applying command-line overrides (layer 5)");
            config.apply(overrides);
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_layer(path: &Path) -> Result<ConfigLayer> {
    let content = fs::read_to_string(path)?;
    ConfigLayer::parse(&content).map_err(|e| Error::InvalidConfig {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
