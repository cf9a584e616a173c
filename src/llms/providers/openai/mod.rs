//! OpenAI native completion provider.
//!
//! Talks to the Chat Completions API (or any compatible endpoint via
//! `base_url`) with native function calling. Tool requests in the reply are
//! parsed into [`ToolRequest`]s; malformed replies are reported as
//! [`LLMError::MalformedReply`] instead of being guessed at.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llms::base_llm::{BaseLLM, LLMError, LLMMessage, ModelReply};
use crate::tools::tool_types::{ToolDefinition, ToolRequest};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat-completions client.
///
/// # Example
///
/// ```ignore
/// let llm = OpenAICompletion::new("gpt-4o", Some(api_key), None).with_temperature(0.2);
/// let reply = llm.chat(&messages, &catalog).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAICompletion {
    /// Model name (e.g., "gpt-4o").
    pub model: String,
    api_key: Option<String>,
    /// Optional custom base URL for compatible gateways.
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Per-request timeout. `None` leaves the request unbounded.
    pub timeout: Option<Duration>,
    /// Maximum number of retries for transport errors, 429 and 5xx.
    pub max_retries: u32,
    /// First retry delay; doubles after every retry.
    pub retry_delay: Duration,
    client: reqwest::Client,
}

impl OpenAICompletion {
    /// Create a new OpenAI completion provider.
    ///
    /// # Arguments
    ///
    /// * `model` - OpenAI model name (e.g., "gpt-4o").
    /// * `api_key` - API key; requests fail with [`LLMError::MissingApiKey`] without one.
    /// * `base_url` - Optional custom base URL.
    pub fn new(model: impl Into<String>, api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.into(),
            api_key,
            base_url,
            temperature: None,
            timeout: None,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Get the API base URL.
    pub fn api_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Build the request body for the Chat Completions API.
    pub fn build_request_body(&self, messages: &[LLMMessage], tools: &[ToolDefinition]) -> Value {
        let wire_messages: Vec<Value> = messages.iter().map(message_to_wire).collect();
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages,
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = json!(temp);
        }
        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = json!(wire_tools);
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Parse a Chat Completions API response.
    pub fn parse_completions_response(&self, response: &Value) -> Result<ModelReply, LLMError> {
        let message = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| LLMError::MalformedReply("no message in OpenAI choices".into()))?;

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "OpenAI token usage: prompt={}, completion={}, total={}",
                usage.get("prompt_tokens").and_then(Value::as_i64).unwrap_or(0),
                usage.get("completion_tokens").and_then(Value::as_i64).unwrap_or(0),
                usage.get("total_tokens").and_then(Value::as_i64).unwrap_or(0),
            );
        }

        let text = message.get("content").and_then(Value::as_str).map(String::from);

        let requests = match message.get("tool_calls") {
            Some(Value::Array(calls)) => calls.iter().map(parse_tool_call).collect::<Result<Vec<_>, _>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(LLMError::MalformedReply(format!("tool_calls is not an array: {}", other)))
            }
        };

        if requests.is_empty() {
            Ok(ModelReply::Final {
                text: text.unwrap_or_default(),
            })
        } else {
            Ok(ModelReply::ToolCalls { text, requests })
        }
    }
}

/// Convert a conversation message to the Chat Completions wire shape.
fn message_to_wire(message: &LLMMessage) -> Value {
    match message {
        LLMMessage::System { content } => json!({"role": "system", "content": content}),
        LLMMessage::User { content } => json!({"role": "user", "content": content}),
        LLMMessage::Assistant { content, tool_calls } => {
            let mut wire = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                let calls: Vec<Value> = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                wire["tool_calls"] = json!(calls);
            }
            wire
        }
        LLMMessage::Tool {
            tool_call_id,
            name,
            content,
        } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "name": name,
            "content": content,
        }),
    }
}

fn parse_tool_call(call: &Value) -> Result<ToolRequest, LLMError> {
    let id = call
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| LLMError::MalformedReply("tool call without id".into()))?;
    let function = call
        .get("function")
        .ok_or_else(|| LLMError::MalformedReply(format!("tool call {} without function", id)))?;
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| LLMError::MalformedReply(format!("tool call {} without name", id)))?;

    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) if raw.trim().is_empty() => json!({}),
        Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|e| {
            LLMError::MalformedReply(format!("invalid arguments for tool call {} ({}): {}", id, name, e))
        })?,
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(Value::Null) | None => json!({}),
        Some(other) => {
            return Err(LLMError::MalformedReply(format!(
                "unexpected arguments for tool call {}: {}",
                id, other
            )))
        }
    };

    Ok(ToolRequest::new(id, name, arguments))
}

#[async_trait]
impl BaseLLM for OpenAICompletion {
    fn model(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "openai"
    }

    async fn chat(&self, messages: &[LLMMessage], tools: &[ToolDefinition]) -> Result<ModelReply, LLMError> {
        log::debug!(
            "OpenAICompletion.chat: model={}, messages={}, tools={}",
            self.model,
            messages.len(),
            tools.len(),
        );

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LLMError::MissingApiKey(self.provider().to_string()))?;

        let body = self.build_request_body(messages, tools);
        let endpoint = format!("{}/chat/completions", self.api_base_url());

        // Retry loop with exponential backoff
        let mut retry_delay = self.retry_delay;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let error = match self.send_once(&endpoint, api_key, &body).await {
                Ok(reply) => return Ok(reply),
                Err(e) if is_retryable(&e) => e,
                Err(e) => return Err(e),
            };
            if attempts > self.max_retries {
                return Err(LLMError::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                });
            }
            log::warn!(
                "OpenAI API attempt {} failed ({}); retrying after {:?}",
                attempts,
                error,
                retry_delay
            );
            tokio::time::sleep(retry_delay).await;
            retry_delay *= 2;
        }
    }
}

impl OpenAICompletion {
    /// One request/response exchange, without retries.
    async fn send_once(&self, endpoint: &str, api_key: &str, body: &Value) -> Result<ModelReply, LLMError> {
        let mut request = self.client.post(endpoint).bearer_auth(api_key).json(body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(LLMError::Api {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            LLMError::MalformedReply(format!(
                "failed to parse OpenAI response: {} - Body: {}",
                e,
                response_text.chars().take(500).collect::<String>()
            ))
        })?;

        self.parse_completions_response(&response_json)
    }
}

/// Transport failures, rate limiting and server errors are worth another try.
fn is_retryable(error: &LLMError) -> bool {
    match error {
        LLMError::Http(_) => true,
        LLMError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}
