//! The tool-calling conversation loop.
//!
//! One [`ConversationLoop::run`] turns a UI instruction into remote tool
//! calls: it seeds a conversation from the discovered system prompt, then
//! alternates model queries and tool dispatch until the model answers with
//! plain text.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::agents::error::TaskError;
use crate::llms::base_llm::{BaseLLM, LLMMessage, ModelReply};
use crate::session::CapabilitySession;
use crate::tools::{tool_catalog, ToolInvoker, ToolRequest};

/// States of one run. A failed run returns its error instead of entering
/// a state.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingModel,
    DispatchingTools(Vec<ToolRequest>),
    Done(String),
}

/// Drives one task from instruction to the model's final text.
pub struct ConversationLoop {
    session: Arc<CapabilitySession>,
    llm: Arc<dyn BaseLLM>,
    invoker: ToolInvoker,
    max_turns: Option<usize>,
}

impl fmt::Debug for ConversationLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationLoop")
            .field("model", &self.llm.model())
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

/// The user message opening every run.
pub fn seed_instruction(session_id: &str, instruction: &str) -> String {
    format!(
        "The user needs a UI. Target Session ID: \"{}\".\nInstruction: {}\n\n\
         Make sure to call create_surface, update_components, and update_data_model as needed.",
        session_id, instruction
    )
}

impl ConversationLoop {
    pub fn new(session: Arc<CapabilitySession>, llm: Arc<dyn BaseLLM>) -> Self {
        Self {
            invoker: ToolInvoker::new(session.clone()),
            session,
            llm,
            max_turns: None,
        }
    }

    /// Builder: cap the number of model queries per run. Unset means the
    /// run ends only when the model stops requesting tools.
    pub fn with_max_turns(mut self, max_turns: Option<usize>) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Run one task and return the model's final text.
    ///
    /// # Errors
    ///
    /// * [`TaskError::ConnectionNotReady`] if the snapshot is not ready, or
    ///   the connection drops while tools are being dispatched.
    /// * [`TaskError::ModelBackend`] if a model query fails or its reply is
    ///   malformed.
    /// * [`TaskError::TurnLimitExceeded`] when a turn cap is configured and hit.
    pub async fn run(&self, session_id: &str, instruction: &str) -> Result<String, TaskError> {
        let snapshot = self.session.current_snapshot();
        if !snapshot.is_ready() {
            return Err(TaskError::ConnectionNotReady);
        }

        let catalog = tool_catalog(&snapshot);
        let mut messages = vec![
            LLMMessage::system(snapshot.system_prompt()),
            LLMMessage::user(seed_instruction(session_id, instruction)),
        ];
        log::info!(
            "Generating UI for session {} ({} tools available)",
            session_id,
            catalog.len()
        );

        let mut state = LoopState::AwaitingModel;
        let mut turns = 0usize;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if let Some(max) = self.max_turns {
                        if turns >= max {
                            log::warn!("Session {}: turn limit {} reached", session_id, max);
                            return Err(TaskError::TurnLimitExceeded(max));
                        }
                    }
                    turns += 1;

                    let reply = match self.llm.chat(&messages, &catalog).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            log::error!("Session {}: model query {} failed: {}", session_id, turns, e);
                            return Err(TaskError::ModelBackend(e));
                        }
                    };
                    check_request_ids(&reply)?;
                    messages.push(reply.to_message());

                    match reply {
                        ModelReply::Final { text } => LoopState::Done(text),
                        ModelReply::ToolCalls { text, requests } if requests.is_empty() => {
                            LoopState::Done(text.unwrap_or_default())
                        }
                        ModelReply::ToolCalls { requests, .. } => LoopState::DispatchingTools(requests),
                    }
                }
                LoopState::DispatchingTools(requests) => {
                    for request in &requests {
                        let outcome = self.invoker.invoke(request).await?;
                        messages.push(LLMMessage::tool(&outcome.request_id, &request.name, outcome.payload));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(text) => {
                    log::info!("Session {}: finished after {} model turns", session_id, turns);
                    return Ok(text);
                }
            };
        }
    }
}

/// Every tool result must reference exactly one request, so ids within a
/// reply have to be unique.
fn check_request_ids(reply: &ModelReply) -> Result<(), TaskError> {
    if let ModelReply::ToolCalls { requests, .. } = reply {
        let mut seen = HashSet::with_capacity(requests.len());
        for request in requests {
            if !seen.insert(request.id.as_str()) {
                return Err(TaskError::DuplicateToolCall(request.id.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::llms::base_llm::LLMError;
    use crate::mcp::types::{CallToolResult, ContentBlock};
    use crate::session::CapabilitySession;
    use crate::testing::{connected_session, ui_tools, ScriptedLLM, StubConnector, StubProvider};

    async fn setup(
        provider: StubProvider,
        replies: Vec<Result<ModelReply, LLMError>>,
    ) -> (ConversationLoop, Arc<ScriptedLLM>, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        let session = connected_session(provider.clone()).await;
        let llm = Arc::new(ScriptedLLM::new(replies));
        (ConversationLoop::new(session, llm.clone()), llm, provider)
    }

    fn call(id: &str, name: &str, args: serde_json::Value) -> ToolRequest {
        ToolRequest::new(id, name, args)
    }

    /// Every assistant tool request is answered before the next assistant turn.
    fn assert_no_dangling_requests(history: &[LLMMessage]) {
        let mut open: Vec<String> = Vec::new();
        for message in history {
            match message {
                LLMMessage::Assistant { tool_calls, .. } => {
                    assert!(open.is_empty(), "unanswered requests: {:?}", open);
                    open = tool_calls.iter().map(|c| c.id.clone()).collect();
                }
                LLMMessage::Tool { tool_call_id, .. } => {
                    let pos = open.iter().position(|id| id == tool_call_id).expect("unknown id");
                    open.remove(pos);
                }
                _ => {}
            }
        }
        assert!(open.is_empty(), "unanswered requests: {:?}", open);
    }

    #[tokio::test]
    async fn test_not_ready_fails_without_querying_model() {
        let session = Arc::new(CapabilitySession::new(Arc::new(StubConnector::failing())));
        let llm = Arc::new(ScriptedLLM::new(vec![Ok(ModelReply::text("never"))]));
        let agent = ConversationLoop::new(session, llm.clone());

        let err = agent.run("s-1", "anything").await.unwrap_err();
        assert!(matches!(err, TaskError::ConnectionNotReady));
        assert_eq!(llm.queries(), 0);
    }

    #[tokio::test]
    async fn test_plain_reply_returns_immediately() {
        let (agent, llm, provider) = setup(
            StubProvider::new(ui_tools(), "SYSTEM"),
            vec![Ok(ModelReply::text("nothing to render"))],
        )
        .await;

        let text = agent.run("s-1", "say hi").await.unwrap();
        assert_eq!(text, "nothing to render");
        assert_eq!(llm.queries(), 1);
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_seed_messages_and_catalog() {
        let (agent, llm, _) = setup(
            StubProvider::new(ui_tools(), "SYSTEM"),
            vec![Ok(ModelReply::text("ok"))],
        )
        .await;
        agent.run("abc-123", "show a form").await.unwrap();

        let histories = llm.histories.lock();
        let first = &histories[0];
        assert_eq!(first.len(), 2);
        assert_eq!(first[0], LLMMessage::system("SYSTEM"));
        match &first[1] {
            LLMMessage::User { content } => {
                assert!(content.contains("Target Session ID: \"abc-123\""));
                assert!(content.contains("Instruction: show a form"));
                assert!(content.contains("create_surface, update_components, and update_data_model"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(llm.catalogs.lock()[0].len(), 5);
    }

    #[tokio::test]
    async fn test_weather_card_end_to_end() {
        let (agent, llm, provider) = setup(
            StubProvider::new(ui_tools(), "SYSTEM"),
            vec![
                Ok(ModelReply::tool_calls(vec![call(
                    "call_1",
                    "create_surface",
                    json!({"sessionId": "s-42", "surfaceId": "weather"}),
                )])),
                Ok(ModelReply::tool_calls(vec![call(
                    "call_2",
                    "update_data_model",
                    json!({"sessionId": "s-42", "data": {"city": "Tokyo", "tempC": 21}}),
                )])),
                Ok(ModelReply::text("done")),
            ],
        )
        .await;

        let text = agent.run("s-42", "show a weather card for Tokyo").await.unwrap();
        assert_eq!(text, "done");

        let calls = provider.calls.lock();
        let names: Vec<&str> = calls.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["create_surface", "update_data_model"]);

        let histories = llm.histories.lock();
        assert_eq!(histories.len(), 3);
        let last = &histories[2];
        let results: Vec<&LLMMessage> = last.iter().filter(|m| m.role() == "tool").collect();
        assert_eq!(results.len(), 2);
        assert_eq!(*results[0], LLMMessage::tool("call_1", "create_surface", "Success"));
        assert_eq!(*results[1], LLMMessage::tool("call_2", "update_data_model", "Success"));
        for history in histories.iter() {
            assert_no_dangling_requests(history);
        }
    }

    #[tokio::test]
    async fn test_multiple_requests_in_one_turn_are_answered_in_order() {
        let (agent, llm, provider) = setup(
            StubProvider::new(ui_tools(), "SYSTEM"),
            vec![
                Ok(ModelReply::tool_calls(vec![
                    call("a", "create_surface", json!({})),
                    call("b", "update_components", json!({})),
                    call("c", "update_data_model", json!({})),
                ])),
                Ok(ModelReply::text("rendered")),
            ],
        )
        .await;
        agent.run("s", "form").await.unwrap();

        assert_eq!(provider.calls.lock().len(), 3);
        let histories = llm.histories.lock();
        let ids: Vec<&str> = histories[1]
            .iter()
            .filter_map(|m| match m {
                LLMMessage::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_no_dangling_requests(&histories[1]);
    }

    #[tokio::test]
    async fn test_missing_uri_is_fed_back_and_loop_continues() {
        let (agent, llm, _) = setup(
            StubProvider::new(ui_tools(), "SYSTEM"),
            vec![
                Ok(ModelReply::tool_calls(vec![call("r1", "read_resource", json!({}))])),
                Ok(ModelReply::text("recovered")),
            ],
        )
        .await;

        assert_eq!(agent.run("s", "x").await.unwrap(), "recovered");
        let histories = llm.histories.lock();
        match histories[1].last().unwrap() {
            LLMMessage::Tool { tool_call_id, content, .. } => {
                assert_eq!(tool_call_id, "r1");
                assert!(content.starts_with("Invalid argument:"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_error_text_reaches_model_verbatim() {
        let (agent, llm, _) = setup(
            StubProvider::new(ui_tools(), "SYSTEM").with_result(
                "update_components",
                CallToolResult::error(vec![ContentBlock::text("surface 'main' does not exist")]),
            ),
            vec![
                Ok(ModelReply::tool_calls(vec![call("u1", "update_components", json!({}))])),
                Ok(ModelReply::text("gave up")),
            ],
        )
        .await;

        assert_eq!(agent.run("s", "x").await.unwrap(), "gave up");
        let histories = llm.histories.lock();
        match histories[1].last().unwrap() {
            LLMMessage::Tool { content, .. } => {
                assert!(content.contains("surface 'main' does not exist"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_model_error_fails_the_run() {
        let (agent, _, _) = setup(
            StubProvider::new(ui_tools(), "SYSTEM"),
            vec![Err(LLMError::Api {
                status: 401,
                body: "bad key".to_string(),
            })],
        )
        .await;
        assert!(matches!(
            agent.run("s", "x").await,
            Err(TaskError::ModelBackend(LLMError::Api { status: 401, .. }))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_call_ids_fail_the_run() {
        let (agent, _, provider) = setup(
            StubProvider::new(ui_tools(), "SYSTEM"),
            vec![Ok(ModelReply::tool_calls(vec![
                call("same", "create_surface", json!({})),
                call("same", "update_components", json!({})),
            ]))],
        )
        .await;
        assert!(matches!(
            agent.run("s", "x").await,
            Err(TaskError::DuplicateToolCall(id)) if id == "same"
        ));
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_turn_limit() {
        let looping: Vec<Result<ModelReply, LLMError>> = (0..5)
            .map(|i| {
                Ok(ModelReply::tool_calls(vec![call(
                    &format!("c{}", i),
                    "update_components",
                    json!({}),
                )]))
            })
            .collect();
        let (agent, llm, _) = setup(StubProvider::new(ui_tools(), "SYSTEM"), looping).await;
        let agent = agent.with_max_turns(Some(2));

        assert!(matches!(
            agent.run("s", "x").await,
            Err(TaskError::TurnLimitExceeded(2))
        ));
        assert_eq!(llm.queries(), 2);
    }

    /// Backend that answers from the conversation alone: two tool calls
    /// tagged with the target session, then the session id as final text.
    #[derive(Debug, Default)]
    struct SessionEchoLLM {
        histories: parking_lot::Mutex<Vec<Vec<LLMMessage>>>,
    }

    fn target_session(history: &[LLMMessage]) -> String {
        match &history[1] {
            LLMMessage::User { content } => content.split('"').nth(1).unwrap_or_default().to_string(),
            other => panic!("unexpected seed message: {:?}", other),
        }
    }

    #[async_trait::async_trait]
    impl BaseLLM for SessionEchoLLM {
        fn model(&self) -> &str {
            "session-echo"
        }

        async fn chat(
            &self,
            messages: &[LLMMessage],
            _tools: &[crate::tools::ToolDefinition],
        ) -> Result<ModelReply, LLMError> {
            tokio::task::yield_now().await;
            self.histories.lock().push(messages.to_vec());
            let target = target_session(messages);
            let answered = messages.iter().any(|m| matches!(m, LLMMessage::Tool { .. }));
            if answered {
                return Ok(ModelReply::text(target));
            }
            Ok(ModelReply::tool_calls(vec![
                call(&format!("{}-surface", target), "create_surface", json!({"sessionId": target})),
                call(&format!("{}-data", target), "update_data_model", json!({"sessionId": target})),
            ]))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_runs_share_session_without_mixing_results() {
        let provider = Arc::new(StubProvider::new(ui_tools(), "SYSTEM"));
        let session = connected_session(provider.clone()).await;
        let llm = Arc::new(SessionEchoLLM::default());
        let agent = Arc::new(ConversationLoop::new(session, llm.clone()));

        let runs: Vec<_> = (0..8)
            .map(|n| {
                let agent = agent.clone();
                tokio::spawn(async move {
                    let target = format!("s-{}", n);
                    let text = agent.run(&target, "draw").await;
                    (target, text)
                })
            })
            .collect();
        for run in runs {
            let (target, text) = run.await.unwrap();
            assert_eq!(text.unwrap(), target);
        }

        let histories = llm.histories.lock();
        assert_eq!(histories.len(), 16);
        for history in histories.iter() {
            let target = target_session(history);
            assert_no_dangling_requests(history);
            for message in history {
                if let LLMMessage::Tool { tool_call_id, .. } = message {
                    assert!(
                        tool_call_id.starts_with(&format!("{}-", target)),
                        "{} got result for {}",
                        target,
                        tool_call_id
                    );
                }
            }
        }

        let calls = provider.calls.lock();
        assert_eq!(calls.len(), 16);
        for n in 0..8 {
            let target = format!("s-{}", n);
            let names: Vec<&str> = calls
                .iter()
                .filter(|(_, args)| args["sessionId"] == target.as_str())
                .map(|(name, _)| name.as_str())
                .collect();
            assert_eq!(names, vec!["create_surface", "update_data_model"]);
        }
    }
}
