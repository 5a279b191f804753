//! Error types for the gateway process

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the gateway from starting or serving
///
/// Per-call failures never surface here; they are answered as JSON-RPC
/// error envelopes by the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be resolved
    #[error("configuration error: {0}")]
    Config(#[from] weave_meta::Error),

    /// Listening socket could not be opened
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
