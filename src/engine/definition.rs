//! Agent and step definition types
//!
//! Definitions are immutable once constructed. Validation happens in the
//! constructors, so a malformed definition fails construction rather than
//! execution, and step kinds are a closed sum type matched exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::llm::LlmProvider;
use crate::memory::StateMap;

/// Callable over the input alone
pub type PlainFn = Arc<dyn Fn(Value) -> anyhow::Result<StepOutput> + Send + Sync>;
/// Callable over the input and a snapshot of the session state
pub type StateFn = Arc<dyn Fn(Value, &StateMap) -> anyhow::Result<StepOutput> + Send + Sync>;

/// Condition evaluated between loop iterations over
/// `(current output, iteration count, session state)`
pub type LoopCondition = Arc<dyn Fn(&Value, u32, &StateMap) -> bool + Send + Sync>;

/// Output of a function or transform step: a bare value, or a value plus
/// state updates to merge into the session before the next step runs
#[derive(Debug, Clone)]
pub enum StepOutput {
    Value(Value),
    WithState {
        value: Value,
        state_updates: serde_json::Map<String, Value>,
    },
}

impl StepOutput {
    /// Attach state updates to an output value
    pub fn with_state(value: Value, state_updates: serde_json::Map<String, Value>) -> Self {
        StepOutput::WithState {
            value,
            state_updates,
        }
    }
}

impl From<Value> for StepOutput {
    fn from(value: Value) -> Self {
        StepOutput::Value(value)
    }
}

/// A step callable, taking the input alone or the input plus a snapshot of
/// the session state
#[derive(Clone)]
pub enum StepFn {
    Plain(PlainFn),
    WithState(StateFn),
}

/// One unit of work inside an agent
#[derive(Clone)]
pub enum StepSpec {
    /// Invoke a user-supplied callable
    Function { id: String, callable: StepFn },
    /// Invoke a named tool from the registry
    Tool { tool_name: String, params: Value },
    /// Reshape the input using the session state
    Transform { id: String, callable: StateFn },
    /// Delegate to another agent
    Agent(Arc<AgentDefinition>),
}

impl StepSpec {
    /// A function step over the input alone
    pub fn function<F>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        StepSpec::Function {
            id: id.into(),
            callable: StepFn::Plain(Arc::new(move |input| f(input).map(StepOutput::Value))),
        }
    }

    /// A function step over the input and session state; may return state
    /// updates alongside its output
    pub fn function_with_state<F>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, &StateMap) -> anyhow::Result<StepOutput> + Send + Sync + 'static,
    {
        StepSpec::Function {
            id: id.into(),
            callable: StepFn::WithState(Arc::new(f)),
        }
    }

    /// A tool invocation step
    pub fn tool(tool_name: impl Into<String>, params: Value) -> Self {
        StepSpec::Tool {
            tool_name: tool_name.into(),
            params,
        }
    }

    /// A transform step over the input and session state
    pub fn transform<F>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, &StateMap) -> anyhow::Result<StepOutput> + Send + Sync + 'static,
    {
        StepSpec::Transform {
            id: id.into(),
            callable: Arc::new(f),
        }
    }

    /// A sub-agent delegation step
    pub fn agent(definition: AgentDefinition) -> Self {
        StepSpec::Agent(Arc::new(definition))
    }
}

impl fmt::Debug for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepSpec::Function { id, .. } => write!(f, "Function({})", id),
            StepSpec::Tool { tool_name, .. } => write!(f, "Tool({})", tool_name),
            StepSpec::Transform { id, .. } => write!(f, "Transform({})", id),
            StepSpec::Agent(def) => write!(f, "Agent({})", def.name()),
        }
    }
}

/// Composition policy applied over an agent's steps
#[derive(Clone)]
pub enum AgentKind {
    /// Steps execute in order, each output feeding the next input
    Sequential { steps: Vec<StepSpec> },
    /// Tasks execute concurrently, each receiving the original input
    Parallel { tasks: Vec<StepSpec> },
    /// The step body repeats while a condition holds, up to a bound
    Loop {
        steps: Vec<StepSpec>,
        condition: LoopCondition,
        max_iterations: u32,
    },
    /// An LLM decides per turn between a tool call and a final answer
    Llm {
        system_prompt: Option<String>,
        provider: Arc<dyn LlmProvider>,
        tools: Vec<String>,
    },
}

impl AgentKind {
    /// Short name for logging and display
    pub fn kind_name(&self) -> &'static str {
        match self {
            AgentKind::Sequential { .. } => "sequential",
            AgentKind::Parallel { .. } => "parallel",
            AgentKind::Loop { .. } => "loop",
            AgentKind::Llm { .. } => "llm",
        }
    }
}

impl fmt::Debug for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Sequential { steps } => {
                write!(f, "Sequential {{ steps: {} }}", steps.len())
            }
            AgentKind::Parallel { tasks } => write!(f, "Parallel {{ tasks: {} }}", tasks.len()),
            AgentKind::Loop {
                steps,
                max_iterations,
                ..
            } => write!(
                f,
                "Loop {{ steps: {}, max_iterations: {} }}",
                steps.len(),
                max_iterations
            ),
            AgentKind::Llm { tools, .. } => write!(f, "Llm {{ tools: {} }}", tools.len()),
        }
    }
}

/// A named, typed pipeline of steps plus kind-specific configuration.
///
/// Owned exclusively by its [`crate::engine::AgentRunner`] once spawned.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    name: String,
    session_id: Option<String>,
    kind: AgentKind,
}

impl AgentDefinition {
    /// A sequential agent
    pub fn sequential(name: impl Into<String>, steps: Vec<StepSpec>) -> EngineResult<Self> {
        Self::build(name, AgentKind::Sequential { steps })
    }

    /// A parallel agent
    pub fn parallel(name: impl Into<String>, tasks: Vec<StepSpec>) -> EngineResult<Self> {
        Self::build(name, AgentKind::Parallel { tasks })
    }

    /// A loop agent. `max_iterations` bounds the loop and must be at least 1.
    pub fn looping<C>(
        name: impl Into<String>,
        steps: Vec<StepSpec>,
        condition: C,
        max_iterations: u32,
    ) -> EngineResult<Self>
    where
        C: Fn(&Value, u32, &StateMap) -> bool + Send + Sync + 'static,
    {
        if max_iterations == 0 {
            return Err(EngineError::InvalidConfig(
                "loop agent requires max_iterations >= 1".to_string(),
            ));
        }
        Self::build(
            name,
            AgentKind::Loop {
                steps,
                condition: Arc::new(condition),
                max_iterations,
            },
        )
    }

    /// An LLM-directed agent. `tools` restricts which registry tools the
    /// model may call; empty means all.
    pub fn llm(
        name: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        system_prompt: Option<String>,
        tools: Vec<String>,
    ) -> EngineResult<Self> {
        if tools.iter().any(|t| t.trim().is_empty()) {
            return Err(EngineError::InvalidConfig(
                "llm agent tool names must be non-empty".to_string(),
            ));
        }
        Self::build(
            name,
            AgentKind::Llm {
                system_prompt,
                provider,
                tools,
            },
        )
    }

    fn build(name: impl Into<String>, kind: AgentKind) -> EngineResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "agent name must be non-empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            session_id: None,
            kind,
        })
    }

    /// Pin this agent to a session
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn kind(&self) -> &AgentKind {
        &self.kind
    }
}

/// How an LLM run concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run produced its final output directly
    Completed,
    /// The run concluded by executing a tool the model requested
    ToolCallCompleted,
}

/// Result of one agent run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Final output of the run
    pub output: Value,
    /// Index-ordered stringification of parallel task results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<String>,
    /// Number of iterations a loop agent performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// How the run concluded
    pub status: RunStatus,
    /// Session the run executed against
    pub session_id: String,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: u64,
}
