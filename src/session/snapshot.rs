//! Immutable view of discovered capabilities.

use std::collections::HashSet;

use crate::mcp::types::CapabilityDescriptor;
use crate::session::SessionError;

/// Tools and system prompt discovered from the provider.
///
/// A snapshot is never mutated after construction; the session swaps in a
/// whole new one on (re)connect. `ready` is only true for snapshots built
/// from a completed discovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySnapshot {
    tools: Vec<CapabilityDescriptor>,
    system_prompt: String,
    ready: bool,
}

impl CapabilitySnapshot {
    /// The sentinel published before discovery has completed.
    pub fn not_ready() -> Self {
        Self::default()
    }

    /// Build a ready snapshot.
    ///
    /// # Errors
    ///
    /// [`SessionError::DuplicateTool`] if two descriptors share a name.
    pub fn new(tools: Vec<CapabilityDescriptor>, system_prompt: impl Into<String>) -> Result<Self, SessionError> {
        let mut seen = HashSet::with_capacity(tools.len());
        for tool in &tools {
            if !seen.insert(tool.name.as_str()) {
                return Err(SessionError::DuplicateTool(tool.name.clone()));
            }
        }
        Ok(Self {
            tools,
            system_prompt: system_prompt.into(),
            ready: true,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn tools(&self) -> &[CapabilityDescriptor] {
        &self.tools
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Look up a discovered tool by name.
    pub fn tool(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }
}
