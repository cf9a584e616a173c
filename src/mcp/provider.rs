//! The capability-provider seam.
//!
//! [`CapabilityProvider`] is the surface the session layer consumes; it is
//! implemented by [`MCPClient`] for real servers and by in-memory stubs in
//! tests. [`ProviderConnector`] opens a fresh, handshaken provider so the
//! session can (re)connect without knowing about transports.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::client::MCPClient;
use crate::mcp::error::McpError;
use crate::mcp::types::{CallToolResult, CapabilityDescriptor, ResourceContents, ResourceDescriptor};

/// Operations consumed from a live capability provider.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<CapabilityDescriptor>, McpError>;

    /// Text of the named prompt.
    async fn get_prompt(&self, id: &str) -> Result<String, McpError>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError>;

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError>;

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, McpError>;

    async fn ping(&self) -> Result<(), McpError>;

    /// Release the connection. Must be idempotent.
    async fn close(&self) -> Result<(), McpError>;

    fn identifier(&self) -> String;
}

/// Opens connections to one capability provider endpoint.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    /// Open a transport and complete the protocol handshake.
    async fn open(&self) -> Result<Arc<dyn CapabilityProvider>, McpError>;

    /// Endpoint description for logs.
    fn endpoint(&self) -> String;
}

#[async_trait]
impl CapabilityProvider for MCPClient {
    async fn list_tools(&self) -> Result<Vec<CapabilityDescriptor>, McpError> {
        MCPClient::list_tools(self).await
    }

    async fn get_prompt(&self, id: &str) -> Result<String, McpError> {
        let prompt = MCPClient::get_prompt(self, id).await?;
        prompt
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| McpError::protocol(format!("prompt '{}' has no text message", id)))
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        MCPClient::call_tool(self, name, arguments).await
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        MCPClient::list_resources(self).await
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, McpError> {
        MCPClient::read_resource(self, uri).await
    }

    async fn ping(&self) -> Result<(), McpError> {
        MCPClient::ping(self).await
    }

    async fn close(&self) -> Result<(), McpError> {
        self.disconnect().await
    }

    fn identifier(&self) -> String {
        self.server_identifier()
    }
}
