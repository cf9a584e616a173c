use thiserror::Error;

use crate::llms::base_llm::LLMError;
use crate::tools::ToolError;

/// Why a task did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("MCP connection not ready")]
    ConnectionNotReady,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown skill: {0}")]
    UnknownSkill(String),

    /// The model query failed or its reply could not be used.
    #[error("Model backend error: {0}")]
    ModelBackend(#[from] LLMError),

    /// The model reused a tool call id within one reply.
    #[error("Duplicate tool call id in model reply: {0}")]
    DuplicateToolCall(String),

    #[error("Turn limit of {0} exceeded")]
    TurnLimitExceeded(usize),

    #[error("Tool dispatch failed: {0}")]
    Tool(ToolError),
}

impl From<ToolError> for TaskError {
    fn from(error: ToolError) -> Self {
        match error {
            ToolError::ConnectionNotReady => Self::ConnectionNotReady,
            other => Self::Tool(other),
        }
    }
}

impl TaskError {
    /// Whether the failure was caused by the caller rather than the agent.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::UnknownSkill(_))
    }
}
