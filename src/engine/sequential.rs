//! Sequential composite
//!
//! Steps run strictly in declared order; the output of step *i* becomes the
//! input of step *i+1* and session state is threaded across steps. The first
//! step failure aborts the run (remaining steps never execute), tagged with
//! the failing step's index. An empty step list returns the input unchanged.

use serde_json::Value;

use super::step::execute_step;
use super::EngineDeps;
use crate::engine::definition::StepSpec;
use crate::error::{EngineError, EngineResult};
use crate::memory::SessionContext;

pub(crate) async fn run(
    steps: &[StepSpec],
    input: Value,
    ctx: &mut SessionContext,
    deps: &EngineDeps,
) -> EngineResult<Value> {
    let mut current = input;

    for (index, step) in steps.iter().enumerate() {
        current = execute_step(step, current, ctx, deps)
            .await
            .map_err(|e| tag_index(e, index))?;
    }

    Ok(current)
}

/// Record the failing step's position, keeping an index set deeper in the
/// pipeline (a nested composite) if one is already present
pub(crate) fn tag_index(err: EngineError, index: usize) -> EngineError {
    match err {
        EngineError::Step(mut step_err) => {
            step_err.index.get_or_insert(index);
            EngineError::Step(step_err)
        }
        other => other,
    }
}
