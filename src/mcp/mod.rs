//! Model Context Protocol (MCP) integration.
//!
//! This module provides the MCP client, endpoint configuration, the
//! Streamable HTTP transport and the [`CapabilityProvider`] seam the
//! capability session is built on.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod transports;
pub mod types;

// Re-export main types.
pub use client::MCPClient;
pub use config::MCPServerHTTP;
pub use error::McpError;
pub use provider::{CapabilityProvider, ProviderConnector};
pub use transports::{BaseTransport, HTTPTransport};
pub use types::{
    CallToolResult, CapabilityDescriptor, ContentBlock, ResourceContents, ResourceDescriptor,
};
