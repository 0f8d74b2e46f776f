//! Step interpreter
//!
//! Executes one step against `(input, session context)`. Every failure mode
//! of a step, including a returned `Err` and a panic inside a user-supplied
//! callable, converts to a typed [`StepError`] here; nothing leaks past this
//! boundary unstructured.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use uuid::Uuid;

use super::definition::{StepFn, StepOutput, StepSpec};
use super::{execute_agent, EngineDeps};
use crate::domain::ToolContext;
use crate::error::{EngineError, EngineResult, StepError, StepErrorKind};
use crate::memory::SessionContext;

/// Execute one step, merging any state updates it produces into the session
/// before returning
pub(crate) async fn execute_step(
    step: &StepSpec,
    input: Value,
    ctx: &mut SessionContext,
    deps: &EngineDeps,
) -> EngineResult<Value> {
    match step {
        StepSpec::Function { id, callable } => {
            let outcome = catch_unwind(AssertUnwindSafe(|| match callable {
                StepFn::Plain(f) => f(input),
                StepFn::WithState(f) => f(input, ctx.state()),
            }));
            let output = unwrap_callable(outcome, StepErrorKind::Function, id)?;
            apply_output(output, ctx).await
        }
        StepSpec::Tool { tool_name, params } => {
            let tool = deps.tools.lookup(tool_name).await.ok_or_else(|| {
                step_error(
                    StepErrorKind::Tool,
                    tool_name,
                    anyhow::anyhow!("tool not found"),
                )
            })?;

            tracing::debug!(tool = %tool_name, session = %ctx.session_id(), "invoking tool step");

            let context = ToolContext {
                session_id: ctx.session_id().to_string(),
            };
            tool.execute(params.clone(), context)
                .await
                .map_err(|e| step_error(StepErrorKind::Tool, tool_name, e))
        }
        StepSpec::Transform { id, callable } => {
            let outcome = catch_unwind(AssertUnwindSafe(|| callable(input, ctx.state())));
            let output = unwrap_callable(outcome, StepErrorKind::Transform, id)?;
            apply_output(output, ctx).await
        }
        StepSpec::Agent(definition) => {
            let session_id = definition
                .session_id()
                .unwrap_or_else(|| ctx.session_id())
                .to_string();

            let result = execute_agent(
                definition.clone(),
                input,
                deps.clone(),
                session_id,
                Uuid::new_v4().to_string(),
            )
            .await
            .map_err(|e| {
                step_error(StepErrorKind::Agent, definition.name(), anyhow::Error::new(e))
            })?;

            Ok(result.output)
        }
    }
}

/// Convert a callable's outcome (value, error, or panic) into a step result
fn unwrap_callable(
    outcome: Result<anyhow::Result<StepOutput>, Box<dyn Any + Send>>,
    kind: StepErrorKind,
    id: &str,
) -> EngineResult<StepOutput> {
    match outcome {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(cause)) => Err(step_error(kind, id, cause)),
        Err(payload) => Err(step_error(
            kind,
            id,
            anyhow::anyhow!("step panicked: {}", panic_message(payload)),
        )),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn apply_output(output: StepOutput, ctx: &mut SessionContext) -> EngineResult<Value> {
    match output {
        StepOutput::Value(value) => Ok(value),
        StepOutput::WithState {
            value,
            state_updates,
        } => {
            ctx.merge_state(state_updates).await?;
            Ok(value)
        }
    }
}

fn step_error(kind: StepErrorKind, id: &str, cause: anyhow::Error) -> EngineError {
    EngineError::Step(StepError::new(kind, id, cause))
}
