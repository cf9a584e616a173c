//! Tools offered to the model.
//!
//! The catalog for a run is the provider's discovered tools plus the two
//! built-in resource tools. [`ToolInvoker`] executes requests against it.

pub mod builtin;
pub mod error;
pub mod invoker;
pub mod tool_types;

pub use error::ToolError;
pub use invoker::ToolInvoker;
pub use tool_types::{ToolDefinition, ToolOutcome, ToolRequest, ToolStatus};

use crate::session::CapabilitySnapshot;

/// Build the tool catalog advertised to the model for one run.
///
/// Discovered tools come first, in discovery order, followed by the
/// built-ins. A discovered tool whose name collides with a built-in is
/// dropped, since requests for that name never reach the provider.
pub fn tool_catalog(snapshot: &CapabilitySnapshot) -> Vec<ToolDefinition> {
    let mut catalog: Vec<ToolDefinition> = snapshot
        .tools()
        .iter()
        .filter(|tool| {
            let shadowed = builtin::is_builtin(&tool.name);
            if shadowed {
                log::warn!("Provider tool '{}' is shadowed by a built-in tool", tool.name);
            }
            !shadowed
        })
        .map(ToolDefinition::from)
        .collect();
    catalog.extend(builtin::builtin_definitions().iter().cloned());
    catalog
}
