//! Error types for the agent execution engine

use thiserror::Error;

/// Errors that can occur while constructing or running agents
#[derive(Debug, Error)]
pub enum EngineError {
    /// Agent definition failed construction-time validation
    #[error("Invalid agent configuration: {0}")]
    InvalidConfig(String),

    /// A step failed during execution
    #[error(transparent)]
    Step(#[from] StepError),

    /// Tool not found in the registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Tool execution failed for '{tool}': {reason}")]
    ToolExecution { tool: String, reason: String },

    /// A run failed at the process boundary (panic or cancellation)
    #[error("Agent '{agent}' execution failed: {reason}")]
    AgentExecution { agent: String, reason: String },

    /// The run exceeded its timeout
    #[error("Run timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider error, passed through unwrapped
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Memory/persistence error
    #[error("Memory error: {0}")]
    Memory(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Execution error
    #[error("Execution error: {0}")]
    Execution(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Memory(format!("IO error: {}", err))
    }
}

/// Which kind of step produced a [`StepError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepErrorKind {
    Function,
    Tool,
    Transform,
    Agent,
}

impl std::fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepErrorKind::Function => write!(f, "function"),
            StepErrorKind::Tool => write!(f, "tool"),
            StepErrorKind::Transform => write!(f, "transform"),
            StepErrorKind::Agent => write!(f, "agent"),
        }
    }
}

/// A step-level failure, tagged with the step's kind and identifier.
///
/// Sequential and loop composites fill in `index` with the position of the
/// failing step for diagnostics.
#[derive(Debug)]
pub struct StepError {
    pub kind: StepErrorKind,
    pub id: String,
    pub index: Option<usize>,
    pub cause: anyhow::Error,
}

impl StepError {
    pub fn new(kind: StepErrorKind, id: impl Into<String>, cause: anyhow::Error) -> Self {
        Self {
            kind,
            id: id.into(),
            index: None,
            cause,
        }
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(
                f,
                "Step '{}' ({}) at index {} failed: {}",
                self.id, self.kind, index, self.cause
            ),
            None => write!(f, "Step '{}' ({}) failed: {}", self.id, self.kind, self.cause),
        }
    }
}

impl std::error::Error for StepError {}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider not found
    #[error("LLM provider not found: {0}")]
    ProviderNotFound(String),

    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
