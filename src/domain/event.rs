//! Session event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Who produced an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAuthor {
    /// End user input
    User,
    /// LLM output
    Model,
    /// Tool result
    Tool,
    /// A sub-agent acting on the session
    Agent,
    /// Application-defined author
    Custom(String),
}

impl std::fmt::Display for EventAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAuthor::User => write!(f, "user"),
            EventAuthor::Model => write!(f, "model"),
            EventAuthor::Tool => write!(f, "tool"),
            EventAuthor::Agent => write!(f, "agent"),
            EventAuthor::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A tool call recorded on an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub args: Value,
}

/// An immutable record of one interaction appended to a session's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: String,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Session this event belongs to
    pub session_id: String,
    /// Run that produced this event, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    /// Who produced the event
    pub author: EventAuthor,
    /// Text content (may be empty for pure tool events)
    #[serde(default)]
    pub content: String,
    /// Tool calls made as part of this event
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    /// Tool results attached to this event
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<Value>,
}

impl Event {
    /// Create a new event for a session. Events are immutable once built;
    /// the `with_*` methods are construction-time builders.
    pub fn new(session_id: impl Into<String>, author: EventAuthor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            invocation_id: None,
            author,
            content: String::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn with_invocation(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = Some(invocation_id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tool_call(mut self, name: impl Into<String>, args: Value) -> Self {
        self.tool_calls.push(ToolCallRecord {
            name: name.into(),
            args,
        });
        self
    }

    pub fn with_tool_result(mut self, result: Value) -> Self {
        self.tool_results.push(result);
        self
    }
}
