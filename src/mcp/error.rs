//! MCP client errors.

use thiserror::Error;

/// Errors raised while talking to an MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// The HTTP exchange itself failed (connection refused, reset, TLS, ...).
    #[error("MCP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("MCP server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A message could not be encoded or decoded.
    #[error("MCP JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The server violated the protocol (missing result, unexpected shape, ...).
    #[error("MCP protocol error: {0}")]
    Protocol(String),

    /// No live connection exists.
    #[error("Client not connected. Call connect() first.")]
    NotConnected,
}

impl McpError {
    /// Build a protocol error from anything printable.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
