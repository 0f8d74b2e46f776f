//! Agent process boundary
//!
//! One [`AgentRunner`] per agent instance: a mailbox plus a single consuming
//! task. Concurrent run requests queue and are served FIFO, so exactly one
//! run is in flight per instance and the instance's view of session memory is
//! never mutated by two runs at once. The runner enforces the per-call
//! timeout, aborts the in-flight run when it fires, and converts run panics
//! into typed errors. A failed run returns the instance to idle; it never
//! becomes permanently unusable.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use uuid::Uuid;

use super::definition::{AgentDefinition, RunResult};
use super::{execute_agent, EngineDeps};
use crate::error::{EngineError, EngineResult};

/// Per-call options for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum wall-clock time for the run; the engine default applies when
    /// unset
    pub timeout: Option<Duration>,
    /// Session to run against; falls back to the definition's session, then
    /// to a fresh one
    pub session_id: Option<String>,
}

struct RunRequest {
    input: Value,
    options: RunOptions,
    reply: oneshot::Sender<EngineResult<RunResult>>,
}

/// Handle to a spawned agent instance
pub struct AgentRunner {
    tx: mpsc::Sender<RunRequest>,
    definition: Arc<AgentDefinition>,
}

impl AgentRunner {
    /// Spawn the consuming task for an agent instance
    pub(crate) fn spawn(
        definition: Arc<AgentDefinition>,
        deps: EngineDeps,
        default_timeout: Duration,
        mailbox_capacity: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<RunRequest>(mailbox_capacity);
        let def = definition.clone();

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let result = serve(
                    def.clone(),
                    deps.clone(),
                    request.input,
                    request.options,
                    default_timeout,
                )
                .await;
                // The caller may have given up; dropping the result is fine
                let _ = request.reply.send(result);
            }
        });

        Self { tx, definition }
    }

    /// Submit a run and wait for its result
    pub async fn run(&self, input: Value, options: RunOptions) -> EngineResult<RunResult> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(RunRequest {
                input,
                options,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::Execution("agent runner has shut down".to_string()))?;

        reply_rx
            .await
            .map_err(|_| EngineError::Execution("agent runner dropped the request".to_string()))?
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }
}

async fn serve(
    definition: Arc<AgentDefinition>,
    deps: EngineDeps,
    input: Value,
    options: RunOptions,
    default_timeout: Duration,
) -> EngineResult<RunResult> {
    let timeout_duration = options.timeout.unwrap_or(default_timeout);
    let session_id = options
        .session_id
        .or_else(|| definition.session_id().map(str::to_string))
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let invocation_id = Uuid::new_v4().to_string();

    tracing::info!(
        agent = %definition.name(),
        kind = %definition.kind().kind_name(),
        session = %session_id,
        invocation = %invocation_id,
        "run started"
    );

    // Run in a child task so a panic anywhere in the pipeline surfaces as a
    // JoinError instead of taking down the mailbox loop.
    let mut handle = tokio::spawn(execute_agent(
        definition.clone(),
        input,
        deps,
        session_id,
        invocation_id,
    ));

    match timeout(timeout_duration, &mut handle).await {
        Ok(Ok(result)) => {
            if let Ok(run) = &result {
                tracing::info!(
                    agent = %definition.name(),
                    execution_time_ms = run.execution_time_ms,
                    "run completed"
                );
            }
            result
        }
        Ok(Err(join_error)) => {
            if join_error.is_panic() {
                Err(EngineError::AgentExecution {
                    agent: definition.name().to_string(),
                    reason: format!("run panicked: {}", join_error),
                })
            } else {
                Err(EngineError::AgentExecution {
                    agent: definition.name().to_string(),
                    reason: "run was cancelled".to_string(),
                })
            }
        }
        Err(_) => {
            // Cancel the in-flight run rather than leaving it orphaned
            handle.abort();
            tracing::warn!(
                agent = %definition.name(),
                timeout_ms = timeout_duration.as_millis() as u64,
                "run timed out"
            );
            Err(EngineError::Timeout(timeout_duration.as_millis() as u64))
        }
    }
}
