//! Tool request, outcome and definition types.
//!
//! A [`ToolRequest`] is what the model asks for, a [`ToolOutcome`] is what
//! gets fed back to it, and a [`ToolDefinition`] is one entry of the catalog
//! advertised to the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::types::CapabilityDescriptor;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Model-assigned call id, unique within one reply.
    pub id: String,
    /// Tool name as advertised in the catalog.
    pub name: String,
    /// Parsed arguments object.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// The result of one [`ToolRequest`], flattened to text for the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Id of the request this answers.
    pub request_id: String,
    pub status: ToolStatus,
    pub payload: String,
}

impl ToolOutcome {
    pub fn success(request_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: ToolStatus::Success,
            payload: payload.into(),
        }
    }

    pub fn error(request_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: ToolStatus::Error,
            payload: payload.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }
}

impl std::fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.payload)
    }
}

/// A callable tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

impl From<&CapabilityDescriptor> for ToolDefinition {
    fn from(descriptor: &CapabilityDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            parameters: descriptor.input_schema.clone(),
        }
    }
}
