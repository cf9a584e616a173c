//! Agents system.
//!
//! This module provides the [`ConversationLoop`] that runs one UI task
//! against the model and the capability session, and the [`TaskError`]
//! reported when a task does not complete.

pub mod conversation_loop;
pub mod error;

// Re-exports for convenience
pub use conversation_loop::{seed_instruction, ConversationLoop, LoopState};
pub use error::TaskError;
