//! Base LLM trait and conversation types.
//!
//! A conversation is an ordered list of [`LLMMessage`]s. Implementations of
//! [`BaseLLM`] send it, together with the tool catalog, to a model and
//! return a [`ModelReply`]: either final text or a list of tool requests.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::tool_types::{ToolDefinition, ToolRequest};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum LLMMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolRequest>,
    },
    /// Result of one tool request, referencing it by id.
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// What the model answered for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Plain text; the conversation is finished.
    Final { text: String },
    /// The model wants tools run before it continues.
    ToolCalls {
        text: Option<String>,
        requests: Vec<ToolRequest>,
    },
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Final { text: text.into() }
    }

    pub fn tool_calls(requests: Vec<ToolRequest>) -> Self {
        Self::ToolCalls {
            text: None,
            requests,
        }
    }

    /// The assistant message recording this reply in the conversation.
    pub fn to_message(&self) -> LLMMessage {
        match self {
            Self::Final { text } => LLMMessage::Assistant {
                content: Some(text.clone()),
                tool_calls: Vec::new(),
            },
            Self::ToolCalls { text, requests } => LLMMessage::Assistant {
                content: text.clone(),
                tool_calls: requests.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API key not set for provider '{0}'")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The reply could not be interpreted (no choices, bad tool arguments...).
    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    /// Every attempt failed with a retryable error; `last` is the final one.
    #[error("Model call failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<LLMError>,
    },
}

// ---------------------------------------------------------------------------
// BaseLLM trait
// ---------------------------------------------------------------------------

/// Interface every model backend implements.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Get the model identifier/name.
    fn model(&self) -> &str;

    /// Get the provider name.
    fn provider(&self) -> &str {
        "openai"
    }

    /// Send the conversation and tool catalog, returning the model's reply.
    async fn chat(&self, messages: &[LLMMessage], tools: &[ToolDefinition]) -> Result<ModelReply, LLMError>;
}
