//! # Freesail UI agent
//!
//! Session and tool orchestration for an agent that renders UIs through a
//! Freesail gateway.
//!
//! The agent keeps a long-lived MCP session to the gateway
//! ([`session::CapabilitySession`]), discovers its tools and system prompt,
//! and runs one tool-calling conversation with the model per incoming task
//! ([`agents::ConversationLoop`]). Tasks arrive over the A2A HTTP endpoint
//! served by [`server`].

pub mod a2a;
pub mod agents;
pub mod config;
pub mod llms;
pub mod mcp;
pub mod server;
pub mod session;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use a2a::TaskService;
pub use agents::{ConversationLoop, TaskError};
pub use config::AgentConfig;
pub use llms::base_llm::BaseLLM;
pub use session::{CapabilitySession, CapabilitySnapshot};
pub use tools::ToolInvoker;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
