use thiserror::Error;

/// Failures while dispatching a tool request.
///
/// Everything except [`ToolError::ConnectionNotReady`] is reported back to
/// the model as an error outcome; the `Display` text is the payload.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Provider-reported failure, text kept verbatim.
    #[error("Error: {0}")]
    RemoteTool(String),

    #[error("MCP connection not ready")]
    ConnectionNotReady,
}
