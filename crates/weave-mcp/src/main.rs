//! Weave MCP gateway
//!
//! An HTTP server that translates MCP `call_tool` requests into Memory API
//! calls.
//!
//! # Usage
//!
//! ```bash
//! weave-mcp [--config <path>] [--bind <addr>] [--api-base <url>] [--verbose]
//! ```
//!
//! # Environment Variables
//!
//! - `WEAVE_API_BASE`, `WEAVE_API_TIMEOUT_SECS`, `WEAVE_BIND`, `WEAVE_ENV`,
//!   `WEAVE_DEBUG_USER`, `WEAVE_MCP_DEBUG`: configuration overrides
//! - `RUST_LOG`: Control log verbosity (default: `weave_mcp=info`; `--verbose`
//!   adds `weave_mcp=debug,tower_http=debug`)

use std::path::PathBuf;

use clap::Parser;
use weave_meta::config::{BackendLayer, RuntimeLayer, ServerLayer};
use weave_meta::{ConfigLayer, ConfigResolver};

/// MCP gateway for the Weave Memory API
#[derive(Parser)]
#[command(name = "weave-mcp")]
#[command(about = "MCP gateway for the Weave Memory API")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:3000
    #[arg(short, long)]
    bind: Option<String>,

    /// Memory API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Flags given on the command line, as the last configuration layer.
    fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            server: ServerLayer {
                bind: self.bind.clone(),
            },
            backend: BackendLayer {
                base_url: self.api_base.clone(),
                timeout_secs: None,
            },
            runtime: RuntimeLayer {
                verbose: self.verbose.then_some(true),
                ..RuntimeLayer::default()
            },
        }
    }
}

/// Log filter directives added on top of `RUST_LOG`.
fn log_directives(verbose: bool) -> &'static [&'static str] {
    if verbose {
        &["weave_mcp=debug", "tower_http=debug"]
    } else {
        &["weave_mcp=info"]
    }
}

/// Whether `--verbose` or `WEAVE_MCP_DEBUG` asks for debug logging.
fn wants_debug(args: &Args) -> bool {
    args.verbose
        || ConfigLayer::from_env(|key| std::env::var(key).ok())
            .ok()
            .and_then(|layer| layer.runtime.verbose)
            .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in log_directives(wants_debug(&args)) {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut resolver = ConfigResolver::new().with_overrides(args.overrides());
    if let Some(ref path) = args.config {
        resolver = resolver.with_config_file(path);
    }
    let config = resolver.resolve()?;

    tracing::info!(
        environment = %config.runtime.environment,
        memory_api = %config.backend.base_url,
        timeout_secs = config.backend.timeout_secs,
        debug_user = config.debug_identity().is_some(),
        "Starting weave-mcp"
    );

    let addr = config.server.bind_addr()?;
    let state = weave_mcp::AppState::from_config(&config)?;
    weave_mcp::serve(addr, state).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_become_the_override_layer() {
        let args = Args::parse_from([
            "weave-mcp",
            "--bind",
            "0.0.0.0:4000",
            "--api-base",
            "http://good:8000",
            "--verbose",
        ]);

        let layer = args.overrides();
        assert_eq!(layer.server.bind.as_deref(), Some("0.0.0.0:4000"));
        assert_eq!(layer.backend.base_url.as_deref(), Some("http://good:8000"));
        assert_eq!(layer.backend.timeout_secs, None);
        assert_eq!(layer.runtime.verbose, Some(true));
        assert_eq!(layer.runtime.environment, None);
    }

    #[test]
    fn no_flags_override_nothing() {
        let args = Args::parse_from(["weave-mcp"]);
        assert_eq!(args.overrides(), ConfigLayer::default());
    }

    #[test]
    fn api_base_flag_rescues_bad_env_value() {
        let global = tempfile::TempDir::new().unwrap();
        let args = Args::parse_from(["weave-mcp", "--api-base", "http://good:8000"]);

        let config = ConfigResolver::new()
            .with_global_config_dir(global.path())
            .with_overrides(args.overrides())
            .resolve_with_env(|key| match key {
                "WEAVE_API_BASE" => Some("localhost:8000".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.backend.base_url, "http://good:8000");
    }

    #[test]
    fn verbose_logging_includes_http_spans() {
        assert_eq!(log_directives(true), &["weave_mcp=debug", "tower_http=debug"]);
        assert_eq!(log_directives(false), &["weave_mcp=info"]);
    }

    #[test]
    fn log_directives_parse() {
        for directive in log_directives(true).iter().chain(log_directives(false)) {
            directive
                .parse::<tracing_subscriber::filter::Directive>()
                .unwrap();
        }
    }
}
