//! MCP client with session management.
//!
//! `MCPClient` wraps a transport and exposes the protocol operations the
//! agent needs: the `initialize` handshake, tool discovery and invocation,
//! named prompt retrieval, resource browsing and `ping`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde_json::Value;

use crate::mcp::error::McpError;
use crate::mcp::transports::BaseTransport;
use crate::mcp::types::{
    initialize_params, CallToolResult, CapabilityDescriptor, GetPromptResult, InitializeResult,
    ListResourcesResult, ListToolsResult, ReadResourceResult, ResourceContents,
    ResourceDescriptor,
};

/// Upper bound on `nextCursor` pages followed during discovery.
pub const MAX_DISCOVERY_PAGES: usize = 64;

/// MCP client over a single transport.
///
/// All operations take `&self`; concurrent callers share the transport,
/// which is responsible for keeping interleaved exchanges apart.
pub struct MCPClient {
    transport: Box<dyn BaseTransport>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for MCPClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MCPClient")
            .field("server", &self.transport.server_identifier())
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .finish()
    }
}

impl MCPClient {
    /// Create a new MCPClient.
    ///
    /// # Arguments
    ///
    /// * `transport` - Transport instance for MCP server connection.
    pub fn new(transport: Box<dyn BaseTransport>) -> Self {
        Self {
            transport,
            initialized: AtomicBool::new(false),
        }
    }

    /// Check if the client is connected to the MCP server.
    ///
    /// Returns `true` only when the transport is connected AND
    /// the handshake has completed.
    pub fn connected(&self) -> bool {
        self.transport.connected() && self.initialized.load(Ordering::Acquire)
    }

    /// Server identifier of the underlying transport.
    pub fn server_identifier(&self) -> String {
        self.transport.server_identifier()
    }

    fn ensure_connected(&self) -> Result<(), McpError> {
        if self.connected() {
            Ok(())
        } else {
            Err(McpError::NotConnected)
        }
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Perform the `initialize` handshake followed by the
    /// `notifications/initialized` notification.
    ///
    /// If already initialized, this is a no-op returning `None`.
    pub async fn initialize(&self) -> Result<Option<InitializeResult>, McpError> {
        if self.connected() {
            return Ok(None);
        }

        let server = self.transport.server_identifier();
        let started_at = Instant::now();
        log::info!("MCP connection started: server='{}'", server);

        let result = self
            .transport
            .request("initialize", Some(initialize_params()))
            .await;

        let init: InitializeResult = match result.and_then(|v| Ok(serde_json::from_value(v)?)) {
            Ok(init) => init,
            Err(e) => {
                let _ = self.transport.disconnect().await;
                log::error!(
                    "MCP connection failed: server='{}', error='{}', duration={}ms",
                    server,
                    e,
                    started_at.elapsed().as_millis()
                );
                return Err(e);
            }
        };

        self.transport.notify("notifications/initialized", None).await?;
        self.initialized.store(true, Ordering::Release);

        log::info!(
            "MCP connection established: server='{}' ({} {}, protocol {}) ({}ms)",
            server,
            init.server_info.name,
            init.server_info.version,
            init.protocol_version,
            started_at.elapsed().as_millis()
        );
        Ok(Some(init))
    }

    /// Disconnect from the MCP server and clean up resources.
    ///
    /// If not connected, this is a no-op.
    pub async fn disconnect(&self) -> Result<(), McpError> {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.transport.disconnect().await
    }

    // -----------------------------------------------------------------------
    // Tools
    // -----------------------------------------------------------------------

    /// List every tool the server exposes, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<CapabilityDescriptor>, McpError> {
        self.ensure_connected()?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_DISCOVERY_PAGES {
            let params = cursor.as_ref().map(|c| serde_json::json!({"cursor": c}));
            let page: ListToolsResult =
                serde_json::from_value(self.transport.request("tools/list", params).await?)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }
        Err(McpError::protocol(format!(
            "tools/list pagination exceeded {} pages",
            MAX_DISCOVERY_PAGES
        )))
    }

    /// Call a tool on the MCP server.
    ///
    /// A tool that ran but failed comes back as `Ok` with `is_error = true`;
    /// `Err` is reserved for transport and protocol failures.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        self.ensure_connected()?;

        let started_at = Instant::now();
        log::info!("MCP tool execution started: tool='{}'", tool_name);

        let params = serde_json::json!({"name": tool_name, "arguments": arguments});
        let result = self.transport.request("tools/call", Some(params)).await;

        match result.and_then(|v| Ok(serde_json::from_value::<CallToolResult>(v)?)) {
            Ok(result) => {
                log::info!(
                    "MCP tool execution completed: tool='{}', is_error={} ({}ms)",
                    tool_name,
                    result.is_error,
                    started_at.elapsed().as_millis()
                );
                Ok(result)
            }
            Err(e) => {
                log::error!(
                    "MCP tool execution failed: tool='{}', error='{}' ({}ms)",
                    tool_name,
                    e,
                    started_at.elapsed().as_millis()
                );
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Prompts
    // -----------------------------------------------------------------------

    /// Get a named prompt from the MCP server.
    pub async fn get_prompt(&self, prompt_name: &str) -> Result<GetPromptResult, McpError> {
        self.ensure_connected()?;
        let params = serde_json::json!({"name": prompt_name});
        let value = self.transport.request("prompts/get", Some(params)).await?;
        Ok(serde_json::from_value(value)?)
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    /// List every resource the server exposes, following pagination.
    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        self.ensure_connected()?;

        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_DISCOVERY_PAGES {
            let params = cursor.as_ref().map(|c| serde_json::json!({"cursor": c}));
            let page: ListResourcesResult =
                serde_json::from_value(self.transport.request("resources/list", params).await?)?;
            resources.extend(page.resources);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(resources),
            }
        }
        Err(McpError::protocol(format!(
            "resources/list pagination exceeded {} pages",
            MAX_DISCOVERY_PAGES
        )))
    }

    /// Read one resource.
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, McpError> {
        self.ensure_connected()?;
        let params = serde_json::json!({"uri": uri});
        let result: ReadResourceResult =
            serde_json::from_value(self.transport.request("resources/read", Some(params)).await?)?;
        Ok(result.contents)
    }

    // -----------------------------------------------------------------------
    // Liveness
    // -----------------------------------------------------------------------

    /// Round-trip a `ping` request.
    pub async fn ping(&self) -> Result<(), McpError> {
        self.ensure_connected()?;
        self.transport.request("ping", None).await.map(|_| ())
    }
}
