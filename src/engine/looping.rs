//! Loop composite
//!
//! Repeats the step body (sequential semantics) while the caller-supplied
//! condition holds over `(current output, iteration count, session state)`,
//! or until the iteration bound is reached. Step failures abort the loop the
//! same way they abort a sequential run.

use serde_json::Value;

use super::definition::{LoopCondition, RunStatus, StepSpec};
use super::{sequential, CompositeOutcome, EngineDeps};
use crate::error::EngineResult;
use crate::memory::SessionContext;

pub(crate) async fn run(
    steps: &[StepSpec],
    condition: &LoopCondition,
    max_iterations: u32,
    input: Value,
    ctx: &mut SessionContext,
    deps: &EngineDeps,
) -> EngineResult<CompositeOutcome> {
    let mut output = input;
    let mut iterations = 0u32;

    while iterations < max_iterations && condition(&output, iterations, ctx.state()) {
        output = sequential::run(steps, output, ctx, deps).await?;
        iterations += 1;
    }

    Ok(CompositeOutcome {
        output,
        combined: None,
        iterations: Some(iterations),
        status: RunStatus::Completed,
    })
}
