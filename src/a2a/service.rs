//! Inbound task handling.
//!
//! [`TaskService`] validates incoming render tasks, rejects them while the
//! capability session is not ready, and runs the conversation loop for the
//! rest.

use std::sync::Arc;
use std::time::Instant;

use crate::a2a::types::{AgentCard, TaskRequest, TaskResponse};
use crate::agents::{ConversationLoop, TaskError};
use crate::session::CapabilitySession;

#[derive(Debug)]
pub struct TaskService {
    session: Arc<CapabilitySession>,
    agent: ConversationLoop,
    card: AgentCard,
}

impl TaskService {
    pub fn new(session: Arc<CapabilitySession>, agent: ConversationLoop, card: AgentCard) -> Self {
        Self { session, agent, card }
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Render a UI for `session_id` and return the model's final text.
    ///
    /// Both fields must be non-blank and the session must be ready; the
    /// model is not queried otherwise.
    pub async fn submit(&self, session_id: &str, instruction: &str) -> Result<String, TaskError> {
        self.admit(session_id, instruction)?;
        self.agent.run(session_id, instruction).await
    }

    /// Preconditions of every run.
    fn admit(&self, session_id: &str, instruction: &str) -> Result<(), TaskError> {
        if session_id.trim().is_empty() || instruction.trim().is_empty() {
            return Err(TaskError::InvalidRequest(
                "session_id and instruction are required.".to_string(),
            ));
        }
        if !self.session.is_ready() {
            return Err(TaskError::ConnectionNotReady);
        }
        Ok(())
    }

    /// Handle one task request.
    ///
    /// Requests rejected up front (skill not on the card, missing input,
    /// session not ready) are returned as `Err`. Tasks that started are
    /// always answered with a [`TaskResponse`], failed or completed.
    pub async fn handle(&self, request: TaskRequest) -> Result<TaskResponse, TaskError> {
        log::info!(
            "Received A2A task {}: {} (Session: {})",
            request.task_id,
            request.skill_id,
            request.input_str("session_id").unwrap_or("-")
        );

        if self.card.skill(&request.skill_id).is_none() {
            return Err(TaskError::UnknownSkill(request.skill_id));
        }
        let session_id = request.input_str("session_id").unwrap_or_default();
        let instruction = request.input_str("instruction").unwrap_or_default();
        self.admit(session_id, instruction)?;

        let started_at = Instant::now();
        match self.agent.run(session_id, instruction).await {
            Ok(output) => {
                log::info!(
                    "Task {} completed in {}ms",
                    request.task_id,
                    started_at.elapsed().as_millis()
                );
                Ok(TaskResponse::completed(request.task_id, output))
            }
            Err(e) => {
                log::error!("Task {} failed: {}", request.task_id, e);
                Ok(TaskResponse::failed(request.task_id, e.to_string()))
            }
        }
    }
}
