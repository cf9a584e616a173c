//! MCP server endpoint configuration.
//!
//! [`MCPServerHTTP`] describes a Streamable HTTP endpoint and doubles as the
//! [`ProviderConnector`] the capability session uses to (re)connect.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::mcp::client::MCPClient;
use crate::mcp::error::McpError;
use crate::mcp::provider::{CapabilityProvider, ProviderConnector};
use crate::mcp::transports::HTTPTransport;

/// Streamable HTTP MCP server configuration.
///
/// # Example
///
/// ```rust
/// use freesail_agent::mcp::config::MCPServerHTTP;
/// use std::collections::HashMap;
///
/// let mut headers = HashMap::new();
/// headers.insert("X-Gateway-Tenant".to_string(), "demo".to_string());
///
/// let config = MCPServerHTTP::new("http://localhost:3000/mcp").with_headers(headers);
/// assert_eq!(config.server_identifier(), "http:http://localhost:3000/mcp");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct MCPServerHTTP {
    /// Server URL (e.g., "http://localhost:3000/mcp").
    pub url: String,
    /// Optional HTTP headers sent with every request.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl std::fmt::Debug for MCPServerHTTP {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MCPServerHTTP")
            .field("url", &self.url)
            .field(
                "headers",
                &self.headers.as_ref().map(|h| {
                    // Mask header values.
                    h.keys().map(|k| format!("{}=<masked>", k)).collect::<Vec<_>>()
                }),
            )
            .finish()
    }
}

impl MCPServerHTTP {
    /// Create a new MCPServerHTTP configuration.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            headers: None,
        }
    }

    /// Set the HTTP headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Get the server identifier for logging.
    pub fn server_identifier(&self) -> String {
        format!("http:{}", self.url)
    }
}

#[async_trait]
impl ProviderConnector for MCPServerHTTP {
    async fn open(&self) -> Result<Arc<dyn CapabilityProvider>, McpError> {
        let transport = HTTPTransport::new(&self.url, self.headers.clone());
        let client = MCPClient::new(Box::new(transport));
        client.initialize().await?;
        Ok(Arc::new(client))
    }

    fn endpoint(&self) -> String {
        self.server_identifier()
    }
}
