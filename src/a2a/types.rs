//! Wire types of the A2A task endpoint and the agent card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Agent card types
// ---------------------------------------------------------------------------

/// Describes a skill/capability this agent offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique identifier for the skill.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    pub description: String,
    /// JSON Schema of the task `input` object.
    pub input_schema: Value,
}

/// Capabilities advertised by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub a2a_version: String,
}

impl Default for AgentCapabilities {
    fn default() -> Self {
        Self {
            a2a_version: "1.0".to_string(),
        }
    }
}

/// Agent card served at `/.well-known/agent-card.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub schema_version: String,
    pub human_readable_id: String,
    pub agent_version: String,
    pub name: String,
    pub description: String,
    /// Base URL other agents reach this one at.
    pub url: String,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// The card of the UI rendering agent, advertised at `url`.
    pub fn ui_agent(url: impl Into<String>) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            human_readable_id: "freesail/ui-agent".to_string(),
            agent_version: crate::VERSION.to_string(),
            name: "Freesail UI Agent".to_string(),
            description: "I render dynamic visual UIs using the Freesail framework based on instructions."
                .to_string(),
            url: url.into(),
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["application/json".to_string()],
            default_output_modes: vec!["application/json".to_string()],
            skills: vec![render_ui_skill()],
        }
    }

    pub fn skill(&self, id: &str) -> Option<&AgentSkill> {
        self.skills.iter().find(|s| s.id == id)
    }
}

/// Id of the one skill this agent serves.
pub const RENDER_UI_SKILL: &str = "render_ui";

fn render_ui_skill() -> AgentSkill {
    AgentSkill {
        id: RENDER_UI_SKILL.to_string(),
        name: "Render UI".to_string(),
        description: "Generates and renders a visual UI for the user based on instructions.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": {"type": "string", "description": "The client session ID to render to"},
                "instruction": {
                    "type": "string",
                    "description": "Description of the UI to render and any relevant data to include."
                }
            },
            "required": ["session_id", "instruction"]
        }),
    }
}

// ---------------------------------------------------------------------------
// Task types
// ---------------------------------------------------------------------------

fn generate_task_id() -> String {
    format!("task-{}", uuid::Uuid::new_v4())
}

/// Body of `POST /a2a/tasks/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Caller-chosen id; generated when omitted.
    #[serde(default = "generate_task_id")]
    pub task_id: String,
    pub skill_id: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

impl TaskRequest {
    pub fn render_ui(session_id: &str, instruction: &str) -> Self {
        let mut input = Map::new();
        input.insert("session_id".to_string(), json!(session_id));
        input.insert("instruction".to_string(), json!(instruction));
        Self {
            task_id: generate_task_id(),
            skill_id: RENDER_UI_SKILL.to_string(),
            input,
        }
    }

    /// A non-blank string input field.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Final state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub message: String,
    /// The model's closing text, for completed tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Response of `POST /a2a/tasks/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskState,
    pub result: TaskResult,
    pub finished_at: DateTime<Utc>,
}

/// Message reported for every completed render.
pub const COMPLETED_MESSAGE: &str = "UI successfully generated and sent to client.";

impl TaskResponse {
    pub fn completed(task_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskState::Completed,
            result: TaskResult {
                message: COMPLETED_MESSAGE.to_string(),
                output: Some(output.into()),
            },
            finished_at: Utc::now(),
        }
    }

    pub fn failed(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskState::Failed,
            result: TaskResult {
                message: message.into(),
                output: None,
            },
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_card_shape() {
        let card = AgentCard::ui_agent("http://localhost:5002");
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["schemaVersion"], "1.0");
        assert_eq!(json["humanReadableId"], "freesail/ui-agent");
        assert_eq!(json["capabilities"]["a2aVersion"], "1.0");
        assert_eq!(json["skills"][0]["id"], "render_ui");
        assert_eq!(
            json["skills"][0]["inputSchema"]["required"],
            json!(["session_id", "instruction"])
        );
        assert!(card.skill("render_ui").is_some());
    }

    #[test]
    fn test_task_request_generates_missing_id() {
        let request: TaskRequest = serde_json::from_value(json!({
            "skill_id": "render_ui",
            "input": {"session_id": "s-1", "instruction": "draw"}
        }))
        .unwrap();
        assert!(request.task_id.starts_with("task-"));
        assert_eq!(request.input_str("session_id"), Some("s-1"));
    }

    #[test]
    fn test_input_str_rejects_blank_and_non_string() {
        let request: TaskRequest = serde_json::from_value(json!({
            "task_id": "t",
            "skill_id": "render_ui",
            "input": {"session_id": "   ", "instruction": 7}
        }))
        .unwrap();
        assert_eq!(request.input_str("session_id"), None);
        assert_eq!(request.input_str("instruction"), None);
        assert_eq!(request.input_str("missing"), None);
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_value(TaskResponse::completed("t-1", "done")).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["result"]["message"], COMPLETED_MESSAGE);
        assert_eq!(json["result"]["output"], "done");

        let json = serde_json::to_value(TaskResponse::failed("t-2", "boom")).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json["result"].get("output").is_none());
    }
}
