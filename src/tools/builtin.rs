//! Built-in resource tools.
//!
//! These two tools are always offered to the model next to whatever the
//! provider advertises; they are served through the session's resource API
//! rather than `tools/call`.

use once_cell::sync::Lazy;
use serde_json::json;

use crate::tools::tool_types::ToolDefinition;

pub const LIST_RESOURCES: &str = "list_resources";
pub const READ_RESOURCE: &str = "read_resource";

static BUILTIN_DEFINITIONS: Lazy<Vec<ToolDefinition>> = Lazy::new(|| {
    vec![
        ToolDefinition::new(
            LIST_RESOURCES,
            "List available MCP resources such as Catalogs.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        ToolDefinition::new(
            READ_RESOURCE,
            "Read the content of a specific MCP resource.",
            json!({
                "type": "object",
                "properties": {
                    "uri": {"type": "string", "description": "The URI of the resource to read."}
                },
                "required": ["uri"]
            }),
        ),
    ]
});

/// Definitions of the built-in tools, in catalog order.
pub fn builtin_definitions() -> &'static [ToolDefinition] {
    &BUILTIN_DEFINITIONS
}

pub fn is_builtin(name: &str) -> bool {
    name == LIST_RESOURCES || name == READ_RESOURCE
}
