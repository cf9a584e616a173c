//! Transport layer for MCP connections.
//!
//! A transport moves JSON-RPC messages to and from one MCP server. The
//! only concrete implementation is [`HTTPTransport`] (MCP Streamable HTTP);
//! [`sse`] holds the event-stream decoder it uses for streamed replies.
//!
//! Transports take `&self` for every exchange so a single connection can be
//! shared by concurrent callers; implementations must keep request ids and
//! session state consistent under interleaving.

pub mod http;
pub mod sse;

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::error::McpError;

pub use http::HTTPTransport;
pub use sse::{SseDecoder, SseEvent};

/// Base trait for MCP transport implementations.
#[async_trait]
pub trait BaseTransport: Send + Sync {
    /// Whether a protocol session is currently open.
    fn connected(&self) -> bool;

    /// Send a request and wait for its response's `result`.
    ///
    /// # Errors
    ///
    /// * Transport failures and non-success HTTP statuses.
    /// * JSON-RPC error objects, mapped to [`McpError::Rpc`].
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError>;

    /// Send a notification; no response is expected.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError>;

    /// Close the protocol session and release server-side state.
    ///
    /// If the transport is not connected, this is a no-op.
    async fn disconnect(&self) -> Result<(), McpError>;

    /// Identifier used in logs, e.g. `"http:https://host/mcp"`.
    fn server_identifier(&self) -> String;
}
