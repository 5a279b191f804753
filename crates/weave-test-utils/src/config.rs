//! [`TestConfigDir`] for configuration file scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use weave_meta::ConfigResolver;

/// A temporary directory holding a global `config.toml` and any number of
/// explicit config files.
pub struct TestConfigDir {
    temp_dir: TempDir,
}

impl Default for TestConfigDir {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestConfigDir: failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write the global `config.toml`.
    pub fn write_global(&self, content: &str) -> PathBuf {
        self.write("config.toml", content)
    }

    /// Write a file relative to the root and return its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content).expect("TestConfigDir: failed to write config file");
        path
    }

    /// A resolver reading its global layer from this directory.
    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new().with_global_config_dir(self.root())
    }
}
