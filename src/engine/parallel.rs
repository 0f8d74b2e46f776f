//! Parallel composite
//!
//! One spawned task per declared task, each receiving the original input and
//! an independent view of the session. Task failures are data, not control
//! flow: a failing task's slot holds an error value while siblings run to
//! completion, and the overall run still succeeds. Results assemble in
//! declaration order regardless of completion order.

use futures::future::join_all;
use serde_json::{json, Value};
use tokio::task::AbortHandle;

use super::definition::{RunStatus, StepSpec};
use super::step::execute_step;
use super::{CompositeOutcome, EngineDeps};
use crate::error::EngineResult;
use crate::memory::SessionContext;

/// Aborts the guarded tasks when dropped, so cancelling a run (e.g. on
/// timeout) also cancels its in-flight parallel tasks instead of orphaning
/// them. Aborting an already-finished task is a no-op.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub(crate) async fn run(
    tasks: &[StepSpec],
    input: Value,
    ctx: &SessionContext,
    deps: &EngineDeps,
) -> EngineResult<CompositeOutcome> {
    let handles: Vec<_> = tasks
        .iter()
        .cloned()
        .map(|task| {
            let input = input.clone();
            let mut task_ctx = ctx.clone();
            let deps = deps.clone();
            tokio::spawn(async move { execute_step(&task, input, &mut task_ctx, &deps).await })
        })
        .collect();

    let _guard = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());

    let joined = join_all(handles).await;

    let mut slots = serde_json::Map::new();
    let mut rendered = Vec::with_capacity(joined.len());

    for (index, join_result) in joined.into_iter().enumerate() {
        let value = match join_result {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => json!({ "error": e.to_string() }),
            Err(join_error) => json!({ "error": format!("task panicked: {}", join_error) }),
        };
        rendered.push(render(&value));
        slots.insert(index.to_string(), value);
    }

    Ok(CompositeOutcome {
        output: Value::Object(slots),
        combined: Some(rendered.join("\n")),
        iterations: None,
        status: RunStatus::Completed,
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
