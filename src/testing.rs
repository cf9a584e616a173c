//! In-memory stand-ins for the capability provider and the model backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::llms::base_llm::{BaseLLM, LLMError, LLMMessage, ModelReply};
use crate::mcp::error::McpError;
use crate::mcp::provider::{CapabilityProvider, ProviderConnector};
use crate::mcp::types::{CallToolResult, CapabilityDescriptor, ResourceContents, ResourceDescriptor};
use crate::session::CapabilitySession;
use crate::tools::tool_types::ToolDefinition;

/// The three UI tools a Freesail gateway advertises.
pub fn ui_tools() -> Vec<CapabilityDescriptor> {
    ["create_surface", "update_components", "update_data_model"]
        .into_iter()
        .map(|name| {
            CapabilityDescriptor::new(
                name,
                format!("{} on a client session", name),
                json!({"type": "object", "properties": {"sessionId": {"type": "string"}}}),
            )
        })
        .collect()
}

pub struct StubProvider {
    tools: Vec<CapabilityDescriptor>,
    prompt: Option<String>,
    results: HashMap<String, CallToolResult>,
    resources: Vec<ResourceDescriptor>,
    contents: Vec<ResourceContents>,
    pub calls: Mutex<Vec<(String, Value)>>,
    pub ping_fails: AtomicBool,
    /// Pings never answer while set.
    pub ping_hangs: AtomicBool,
    pub closed: AtomicBool,
    pub close_count: AtomicUsize,
}

impl StubProvider {
    pub fn new(tools: Vec<CapabilityDescriptor>, prompt: &str) -> Self {
        Self {
            tools,
            prompt: Some(prompt.to_string()),
            results: HashMap::new(),
            resources: Vec::new(),
            contents: Vec::new(),
            calls: Mutex::new(Vec::new()),
            ping_fails: AtomicBool::new(false),
            ping_hangs: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
        }
    }

    pub fn without_prompt(mut self) -> Self {
        self.prompt = None;
        self
    }

    pub fn with_result(mut self, tool: &str, result: CallToolResult) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    pub fn with_resources(mut self, resources: Vec<ResourceDescriptor>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_contents(mut self, contents: Vec<ResourceContents>) -> Self {
        self.contents = contents;
        self
    }
}

#[async_trait]
impl CapabilityProvider for StubProvider {
    async fn list_tools(&self) -> Result<Vec<CapabilityDescriptor>, McpError> {
        Ok(self.tools.clone())
    }

    async fn get_prompt(&self, id: &str) -> Result<String, McpError> {
        self.prompt.clone().ok_or_else(|| McpError::Rpc {
            code: -32602,
            message: format!("Prompt not found: {}", id),
        })
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        self.calls.lock().push((name.to_string(), arguments));
        if let Some(result) = self.results.get(name) {
            return Ok(result.clone());
        }
        if self.tools.iter().any(|t| t.name == name) {
            Ok(CallToolResult::success(Vec::new()))
        } else {
            Err(McpError::Rpc {
                code: -32602,
                message: format!("Unknown tool: {}", name),
            })
        }
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        Ok(self.resources.clone())
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, McpError> {
        Ok(self.contents.iter().filter(|c| c.uri == uri).cloned().collect())
    }

    async fn ping(&self) -> Result<(), McpError> {
        if self.ping_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.ping_fails.load(Ordering::SeqCst) {
            Err(McpError::protocol("ping failed"))
        } else {
            Ok(())
        }
    }

    async fn close(&self) -> Result<(), McpError> {
        self.closed.store(true, Ordering::SeqCst);
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn identifier(&self) -> String {
        "stub".to_string()
    }
}

/// Connector handing out one shared [`StubProvider`], or failing.
pub struct StubConnector {
    provider: Option<Arc<StubProvider>>,
    pub opens: AtomicUsize,
    /// `open` never completes while set.
    pub open_hangs: AtomicBool,
}

impl StubConnector {
    pub fn new(provider: Arc<StubProvider>) -> Self {
        Self {
            provider: Some(provider),
            opens: AtomicUsize::new(0),
            open_hangs: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        Self {
            provider: None,
            opens: AtomicUsize::new(0),
            open_hangs: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ProviderConnector for StubConnector {
    async fn open(&self) -> Result<Arc<dyn CapabilityProvider>, McpError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.open_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        match &self.provider {
            Some(provider) => {
                provider.closed.store(false, Ordering::SeqCst);
                Ok(provider.clone())
            }
            None => Err(McpError::Status {
                status: 503,
                body: "gateway unavailable".to_string(),
            }),
        }
    }

    fn endpoint(&self) -> String {
        "stub://gateway".to_string()
    }
}

/// A session already connected to `provider`.
pub async fn connected_session(provider: Arc<StubProvider>) -> Arc<CapabilitySession> {
    let session = Arc::new(CapabilitySession::new(Arc::new(StubConnector::new(provider))));
    session.connect().await.expect("stub connect");
    session
}

/// Model backend replaying a fixed script of replies.
#[derive(Debug, Default)]
pub struct ScriptedLLM {
    replies: Mutex<VecDeque<Result<ModelReply, LLMError>>>,
    /// Conversation sent with every query.
    pub histories: Mutex<Vec<Vec<LLMMessage>>>,
    /// Tool names advertised with every query.
    pub catalogs: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLLM {
    pub fn new(replies: Vec<Result<ModelReply, LLMError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.histories.lock().len()
    }
}

#[async_trait]
impl BaseLLM for ScriptedLLM {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, messages: &[LLMMessage], tools: &[ToolDefinition]) -> Result<ModelReply, LLMError> {
        self.histories.lock().push(messages.to_vec());
        self.catalogs
            .lock()
            .push(tools.iter().map(|t| t.name.clone()).collect());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::MalformedReply("script exhausted".to_string())))
    }
}
