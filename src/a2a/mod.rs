//! A2A (Agent-to-Agent) task surface.
//!
//! Provides the agent card, the task request/response types, and the
//! [`TaskService`] that turns accepted tasks into conversation loop runs.

pub mod service;
pub mod types;

pub use service::TaskService;
pub use types::{AgentCard, AgentSkill, TaskRequest, TaskResponse, TaskState, RENDER_UI_SKILL};
