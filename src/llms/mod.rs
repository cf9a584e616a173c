//! LLM system.
//!
//! - [`base_llm`] - The base trait for model backends and the conversation types
//! - [`providers`] - Native provider implementations (OpenAI)

pub mod base_llm;
pub mod providers;

// Re-exports for convenience
pub use base_llm::{BaseLLM, LLMError, LLMMessage, ModelReply};
pub use providers::openai::OpenAICompletion;
