use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod event;
mod message;

pub use event::{Event, EventAuthor, ToolCallRecord};
pub use message::{ChatMessage, Role};

/// Description of a tool as advertised to callers and LLMs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters
    pub parameters: Value,
}

/// Per-invocation context handed to a tool
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: String,
}

/// A capability that can be invoked by name with JSON parameters.
///
/// Implementations are registered in a [`crate::tools::ToolRegistry`] and
/// invoked by tool steps and the LLM composite.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, params: Value, context: ToolContext) -> anyhow::Result<Value>;
}
