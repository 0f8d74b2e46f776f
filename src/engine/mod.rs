//! Agent execution engine
//!
//! Validated agent definitions run through composite policies (sequential,
//! parallel, loop, LLM-directed) that drive the step interpreter against
//! per-session memory, behind a single-writer [`AgentRunner`] boundary.

mod definition;
mod llm_composite;
mod looping;
mod parallel;
mod runner;
mod sequential;
mod step;

pub use definition::{
    AgentDefinition, AgentKind, LoopCondition, RunResult, RunStatus, StepFn, StepOutput, StepSpec,
};
pub use runner::{AgentRunner, RunOptions};

#[cfg(test)]
mod composite_test;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::config::Settings;
use crate::domain::Tool;
use crate::error::EngineResult;
use crate::memory::{create_store, SessionContext, SessionStore};
use crate::tools::ToolRegistry;

/// Injected repositories the engine calls into
#[derive(Clone)]
pub(crate) struct EngineDeps {
    pub store: Arc<dyn SessionStore>,
    pub tools: Arc<ToolRegistry>,
}

/// What a composite produces before the run envelope is attached
pub(crate) struct CompositeOutcome {
    pub output: Value,
    pub combined: Option<String>,
    pub iterations: Option<u32>,
    pub status: RunStatus,
}

impl CompositeOutcome {
    fn completed(output: Value) -> Self {
        Self {
            output,
            combined: None,
            iterations: None,
            status: RunStatus::Completed,
        }
    }
}

/// Execute one agent against a session. Boxed so agent steps can recurse.
pub(crate) fn execute_agent(
    definition: Arc<AgentDefinition>,
    input: Value,
    deps: EngineDeps,
    session_id: String,
    invocation_id: String,
) -> BoxFuture<'static, EngineResult<RunResult>> {
    Box::pin(async move {
        let start = Instant::now();

        let mut ctx = SessionContext::load(deps.store.clone(), session_id, invocation_id).await?;

        let outcome = match definition.kind() {
            AgentKind::Sequential { steps } => {
                CompositeOutcome::completed(sequential::run(steps, input, &mut ctx, &deps).await?)
            }
            AgentKind::Parallel { tasks } => parallel::run(tasks, input, &ctx, &deps).await?,
            AgentKind::Loop {
                steps,
                condition,
                max_iterations,
            } => looping::run(steps, condition, *max_iterations, input, &mut ctx, &deps).await?,
            AgentKind::Llm {
                system_prompt,
                provider,
                tools,
            } => {
                llm_composite::run(
                    system_prompt.as_deref(),
                    provider.clone(),
                    tools,
                    input,
                    &mut ctx,
                    &deps,
                )
                .await?
            }
        };

        Ok(RunResult {
            output: outcome.output,
            combined: outcome.combined,
            iterations: outcome.iterations,
            status: outcome.status,
            session_id: ctx.session_id().to_string(),
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    })
}

/// Engine runtime: owns the injected session store and tool registry for the
/// process lifetime and spawns agent runners wired to them.
pub struct Runtime {
    store: Arc<dyn SessionStore>,
    tools: Arc<ToolRegistry>,
    settings: Settings,
}

impl Runtime {
    /// Create a runtime over explicit repositories with default settings
    pub fn new(store: Arc<dyn SessionStore>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            store,
            tools,
            settings: Settings::default(),
        }
    }

    /// Create a runtime from settings, building the configured memory backend
    pub fn from_settings(settings: Settings) -> EngineResult<Self> {
        let store = create_store(&settings.memory)?;
        Ok(Self {
            store,
            tools: Arc::new(ToolRegistry::new()),
            settings,
        })
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    pub fn tools(&self) -> Arc<ToolRegistry> {
        self.tools.clone()
    }

    /// Register a tool with the runtime's registry
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) {
        self.tools.register(tool).await;
    }

    /// Spawn an agent runner for a definition
    pub fn spawn(&self, definition: AgentDefinition) -> AgentRunner {
        AgentRunner::spawn(
            Arc::new(definition),
            EngineDeps {
                store: self.store.clone(),
                tools: self.tools.clone(),
            },
            Duration::from_secs(self.settings.engine.default_timeout_seconds),
            self.settings.engine.mailbox_capacity,
        )
    }
}
