//! Vibe LLM
//!
//! Structured-output requests against OpenAI-compatible chat completion APIs,
//! the JSON schemas used by the book's code features, and a small
//! tool-calling conversation loop.

pub mod agent;
pub mod client;
pub mod error;
pub mod model;
pub mod schemas;

#[cfg(test)]
mod mock;

pub use agent::{structured_output_agent, AgentConversation, ToolHandler, ToolRegistry};
pub use client::{
    ChatMessage, FunctionCall, Role, StructuredOutputClient, StructuredRequest, ToolCall,
    ToolDefinition, DEFAULT_BASE_URL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
pub use error::{LlmError, Result};
pub use model::{is_valid_model, OpenAiModel};
pub use schemas::{
    analysis_prompt, code_analysis_schema, code_generation_schema, CodeAnalysis,
    CodeAnalysisResult, CodeGenerationResult, GeneratedCode, SkillLevel, SuggestedImprovement,
};
