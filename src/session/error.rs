//! Capability session errors.

use thiserror::Error;

use crate::mcp::error::McpError;
use crate::mcp::types::ContentBlock;

/// Errors raised by [`CapabilitySession`](super::CapabilitySession).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Handshake or discovery has not completed, or the connection was lost.
    #[error("MCP connection not ready")]
    ConnectionNotReady,

    /// Discovery returned two tools with the same name.
    #[error("Duplicate tool name in capability catalog: {0}")]
    DuplicateTool(String),

    /// The well-known system prompt could not be fetched.
    #[error("Failed to fetch prompt '{id}': {source}")]
    Prompt {
        id: String,
        #[source]
        source: McpError,
    },

    /// Connect plus discovery did not finish in time.
    #[error("MCP connection timed out after {0} seconds")]
    ConnectTimeout(u64),

    /// The provider executed the tool and reported a failure.
    #[error("Tool '{tool}' reported an error")]
    RemoteTool {
        tool: String,
        content: Vec<ContentBlock>,
    },

    /// Transport or protocol failure talking to the provider.
    #[error(transparent)]
    Provider(#[from] McpError),
}
