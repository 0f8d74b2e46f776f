use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::*;
use crate::domain::{ChatMessage, EventAuthor, Tool, ToolContext, ToolDefinition};
use crate::error::{EngineError, LlmError, LlmResult, StepErrorKind};
use crate::llm::{GenerateOptions, LlmProvider};
use crate::memory::{InMemoryStore, SessionStore};
use crate::tools::ToolRegistry;

/// Tool that echoes its params and the calling session
struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "echo".to_string(),
            description: "Echoes its parameters".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    async fn execute(&self, params: Value, context: ToolContext) -> anyhow::Result<Value> {
        Ok(json!({ "echo": params, "session": context.session_id }))
    }
}

/// Tool that always fails
struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "broken".to_string(),
            description: "Always fails".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    async fn execute(&self, _params: Value, _context: ToolContext) -> anyhow::Result<Value> {
        Err(anyhow::anyhow!("simulated tool failure"))
    }
}

/// Provider that pops scripted replies and records the messages it was sent
struct ScriptedProvider {
    replies: Mutex<VecDeque<LlmResult<String>>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<LlmResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn messages_seen(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "test-model"
    }

    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        _options: GenerateOptions,
    ) -> LlmResult<String> {
        self.seen.lock().unwrap().push(messages);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidRequest("no scripted reply".to_string())))
    }
}

async fn test_deps() -> (EngineDeps, Arc<dyn SessionStore>) {
    let store: Arc<dyn SessionStore> = Arc::new(InMemoryStore::new(1000));
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(EchoTool)).await;
    tools.register(Arc::new(FailingTool)).await;
    (
        EngineDeps {
            store: store.clone(),
            tools,
        },
        store,
    )
}

async fn run(
    definition: AgentDefinition,
    input: Value,
    deps: &EngineDeps,
    session_id: &str,
) -> crate::error::EngineResult<RunResult> {
    execute_agent(
        Arc::new(definition),
        input,
        deps.clone(),
        session_id.to_string(),
        "inv-test".to_string(),
    )
    .await
}

fn add_step(id: &str, amount: i64) -> StepSpec {
    StepSpec::function(id, move |input| {
        let n = input.as_i64().unwrap_or(0);
        Ok(json!(n + amount))
    })
}

#[tokio::test]
async fn test_sequential_chains_outputs() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::sequential(
        "chain",
        vec![add_step("add1", 1), add_step("add10", 10), add_step("add100", 100)],
    )
    .unwrap();

    let result = run(agent, json!(0), &deps, "s1").await.unwrap();
    assert_eq!(result.output, json!(111));
    assert_eq!(result.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_sequential_empty_returns_input() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::sequential("empty", vec![]).unwrap();
    let result = run(agent, json!({"kept": true}), &deps, "s1").await.unwrap();

    assert_eq!(result.output, json!({"kept": true}));
}

#[tokio::test]
async fn test_sequential_fail_fast() {
    let (deps, _) = test_deps().await;
    let executed = Arc::new(AtomicUsize::new(0));

    let before = executed.clone();
    let after = executed.clone();
    let agent = AgentDefinition::sequential(
        "failing",
        vec![
            StepSpec::function("first", move |input| {
                before.fetch_add(1, Ordering::SeqCst);
                Ok(input)
            }),
            StepSpec::function("boom", |_| Err(anyhow::anyhow!("step failure"))),
            StepSpec::function("never", move |input| {
                after.fetch_add(1, Ordering::SeqCst);
                Ok(input)
            }),
        ],
    )
    .unwrap();

    let err = run(agent, json!(null), &deps, "s1").await.unwrap_err();

    match err {
        EngineError::Step(step_err) => {
            assert_eq!(step_err.kind, StepErrorKind::Function);
            assert_eq!(step_err.id, "boom");
            assert_eq!(step_err.index, Some(1));
        }
        other => panic!("expected step error, got {:?}", other),
    }
    // Only the first step ran
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_function_panic_becomes_step_error() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::sequential(
        "panicky",
        vec![StepSpec::function("explode", |_| -> anyhow::Result<Value> {
            panic!("boom");
        })],
    )
    .unwrap();

    let err = run(agent, json!(null), &deps, "s1").await.unwrap_err();

    match err {
        EngineError::Step(step_err) => {
            assert_eq!(step_err.kind, StepErrorKind::Function);
            assert!(step_err.cause.to_string().contains("panicked"));
        }
        other => panic!("expected step error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_state_updates_visible_to_later_steps_and_store() {
    let (deps, store) = test_deps().await;

    let agent = AgentDefinition::sequential(
        "stateful",
        vec![
            StepSpec::function_with_state("write", |input, _state| {
                let mut updates = serde_json::Map::new();
                updates.insert("flag".to_string(), json!("set"));
                Ok(StepOutput::with_state(input, updates))
            }),
            StepSpec::function_with_state("read", |_input, state| {
                Ok(StepOutput::Value(
                    state.get("flag").cloned().unwrap_or(Value::Null),
                ))
            }),
        ],
    )
    .unwrap();

    let result = run(agent, json!(null), &deps, "s1").await.unwrap();

    assert_eq!(result.output, json!("set"));
    assert_eq!(
        store.get_state("s1", "flag").await.unwrap(),
        Some(json!("set"))
    );
}

#[tokio::test]
async fn test_tool_step_executes_and_sees_session() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::sequential(
        "tooling",
        vec![StepSpec::tool("echo", json!({"q": 1}))],
    )
    .unwrap();

    let result = run(agent, json!(null), &deps, "s-tool").await.unwrap();

    assert_eq!(result.output["echo"], json!({"q": 1}));
    assert_eq!(result.output["session"], json!("s-tool"));
}

#[tokio::test]
async fn test_tool_step_not_found() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::sequential(
        "missing-tool",
        vec![StepSpec::tool("no_such_tool", json!({}))],
    )
    .unwrap();

    let err = run(agent, json!(null), &deps, "s1").await.unwrap_err();

    match err {
        EngineError::Step(step_err) => {
            assert_eq!(step_err.kind, StepErrorKind::Tool);
            assert_eq!(step_err.id, "no_such_tool");
            assert!(step_err.cause.to_string().contains("not found"));
        }
        other => panic!("expected step error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transform_step_reads_state() {
    let (deps, store) = test_deps().await;
    store
        .update_state("s1", "prefix", json!("result: "))
        .await
        .unwrap();

    let agent = AgentDefinition::sequential(
        "transforming",
        vec![StepSpec::transform("prefix", |input, state| {
            let prefix = state
                .get("prefix")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let body = input.as_str().unwrap_or_default();
            Ok(StepOutput::Value(json!(format!("{}{}", prefix, body))))
        })],
    )
    .unwrap();

    let result = run(agent, json!("ok"), &deps, "s1").await.unwrap();
    assert_eq!(result.output, json!("result: ok"));
}

#[tokio::test]
async fn test_agent_step_delegates_and_wraps_errors() {
    let (deps, _) = test_deps().await;

    let inner = AgentDefinition::sequential("inner", vec![add_step("add5", 5)]).unwrap();
    let outer = AgentDefinition::sequential(
        "outer",
        vec![add_step("add1", 1), StepSpec::agent(inner)],
    )
    .unwrap();

    let result = run(outer, json!(0), &deps, "s1").await.unwrap();
    assert_eq!(result.output, json!(6));

    // A failing sub-agent surfaces as an agent-kind step error
    let bad_inner = AgentDefinition::sequential(
        "bad-inner",
        vec![StepSpec::function("boom", |_| Err(anyhow::anyhow!("inner failure")))],
    )
    .unwrap();
    let outer = AgentDefinition::sequential("outer", vec![StepSpec::agent(bad_inner)]).unwrap();

    let err = run(outer, json!(null), &deps, "s1").await.unwrap_err();
    match err {
        EngineError::Step(step_err) => {
            assert_eq!(step_err.kind, StepErrorKind::Agent);
            assert_eq!(step_err.id, "bad-inner");
        }
        other => panic!("expected step error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_parallel_index_completeness_and_isolation() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::parallel(
        "fan-out",
        vec![
            add_step("add1", 1),
            StepSpec::function("boom", |_| Err(anyhow::anyhow!("task failure"))),
            add_step("add3", 3),
        ],
    )
    .unwrap();

    let result = run(agent, json!(10), &deps, "s1").await.unwrap();

    // Every index is present, each holding its own outcome
    assert_eq!(result.output["0"], json!(11));
    assert!(result.output["1"]["error"]
        .as_str()
        .unwrap()
        .contains("task failure"));
    assert_eq!(result.output["2"], json!(13));
    assert_eq!(result.output.as_object().unwrap().len(), 3);
    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.combined.is_some());
}

#[tokio::test]
async fn test_parallel_tasks_receive_original_input() {
    let (deps, _) = test_deps().await;

    // If tasks were chained, the second would see 1 rather than 0
    let agent = AgentDefinition::parallel(
        "same-input",
        vec![add_step("a", 1), add_step("b", 1)],
    )
    .unwrap();

    let result = run(agent, json!(0), &deps, "s1").await.unwrap();
    assert_eq!(result.output["0"], json!(1));
    assert_eq!(result.output["1"], json!(1));
}

#[tokio::test]
async fn test_parallel_empty() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::parallel("nothing", vec![]).unwrap();
    let result = run(agent, json!(1), &deps, "s1").await.unwrap();

    assert_eq!(result.output, json!({}));
    assert_eq!(result.combined.as_deref(), Some(""));
}

#[tokio::test]
async fn test_loop_runs_until_condition_fails() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::looping(
        "count-up",
        vec![add_step("add1", 1)],
        |output, _iteration, _state| output.as_i64().unwrap_or(0) < 3,
        100,
    )
    .unwrap();

    let result = run(agent, json!(0), &deps, "s1").await.unwrap();

    assert_eq!(result.output, json!(3));
    assert_eq!(result.iterations, Some(3));
}

#[tokio::test]
async fn test_loop_respects_max_iterations() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::looping(
        "bounded",
        vec![add_step("add1", 1)],
        |_output, _iteration, _state| true,
        5,
    )
    .unwrap();

    let result = run(agent, json!(0), &deps, "s1").await.unwrap();

    assert_eq!(result.output, json!(5));
    assert_eq!(result.iterations, Some(5));
}

#[tokio::test]
async fn test_loop_condition_false_at_start() {
    let (deps, _) = test_deps().await;

    let agent = AgentDefinition::looping(
        "no-op",
        vec![add_step("add1", 1)],
        |_output, _iteration, _state| false,
        5,
    )
    .unwrap();

    let result = run(agent, json!(42), &deps, "s1").await.unwrap();

    assert_eq!(result.output, json!(42));
    assert_eq!(result.iterations, Some(0));
}

#[tokio::test]
async fn test_loop_step_failure_aborts() {
    let (deps, _) = test_deps().await;
    let bodies = Arc::new(AtomicUsize::new(0));

    let counter = bodies.clone();
    let agent = AgentDefinition::looping(
        "abortive",
        vec![StepSpec::function("boom-on-second", move |input| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n >= 1 {
                Err(anyhow::anyhow!("second iteration failure"))
            } else {
                Ok(input)
            }
        })],
        |_output, _iteration, _state| true,
        10,
    )
    .unwrap();

    let err = run(agent, json!(null), &deps, "s1").await.unwrap_err();
    assert!(matches!(err, EngineError::Step(_)));
    assert_eq!(bodies.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_llm_final_answer() {
    let (deps, store) = test_deps().await;
    let provider = ScriptedProvider::new(vec![Ok("The weather is sunny.".to_string())]);

    let agent = AgentDefinition::llm(
        "assistant",
        provider.clone(),
        Some("You are helpful.".to_string()),
        vec![],
    )
    .unwrap();

    let result = run(agent, json!("How's the weather?"), &deps, "s-llm")
        .await
        .unwrap();

    assert_eq!(result.output, json!("The weather is sunny."));
    assert_eq!(result.status, RunStatus::Completed);

    // System prompt then the user turn
    let seen = provider.messages_seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0].content, "You are helpful.");
    assert_eq!(seen[0].last().unwrap().content, "How's the weather?");

    // User and model events recorded
    let history = store.history("s-llm").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].author, EventAuthor::User);
    assert_eq!(history[1].author, EventAuthor::Model);
}

#[tokio::test]
async fn test_llm_history_threads_across_runs() {
    let (deps, _) = test_deps().await;
    let provider = ScriptedProvider::new(vec![
        Ok("First answer.".to_string()),
        Ok("Second answer.".to_string()),
    ]);

    let agent = AgentDefinition::llm("assistant", provider.clone(), None, vec![]).unwrap();
    let agent2 = agent.clone();

    run(agent, json!("first question"), &deps, "s-conv")
        .await
        .unwrap();
    run(agent2, json!("second question"), &deps, "s-conv")
        .await
        .unwrap();

    let seen = provider.messages_seen();
    let second_call = &seen[1];
    let contents: Vec<&str> = second_call.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["first question", "First answer.", "second question"]
    );
}

#[tokio::test]
async fn test_llm_tool_call_directive() {
    let (deps, store) = test_deps().await;
    let provider = ScriptedProvider::new(vec![Ok(
        r#"call_tool("echo", {"location": "Paris"})"#.to_string()
    )]);

    let agent = AgentDefinition::llm("assistant", provider, None, vec![]).unwrap();

    let result = run(agent, json!("check paris"), &deps, "s-tools")
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::ToolCallCompleted);
    assert_eq!(result.output["echo"], json!({"location": "Paris"}));

    // User, model (with the call), and tool result events
    let history = store.history("s-tools").await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].tool_calls.len(), 1);
    assert_eq!(history[1].tool_calls[0].name, "echo");
    assert_eq!(history[2].author, EventAuthor::Tool);
    assert_eq!(history[2].tool_results.len(), 1);
}

#[tokio::test]
async fn test_llm_missing_tool_fails_run() {
    let (deps, _) = test_deps().await;
    let provider =
        ScriptedProvider::new(vec![Ok(r#"call_tool("ghost", {})"#.to_string())]);

    let agent = AgentDefinition::llm("assistant", provider, None, vec![]).unwrap();

    let err = run(agent, json!("go"), &deps, "s1").await.unwrap_err();

    match err {
        EngineError::ToolExecution { tool, reason } => {
            assert_eq!(tool, "ghost");
            assert!(reason.contains("not found"));
        }
        other => panic!("expected tool execution error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_llm_tool_outside_allowlist_fails_run() {
    let (deps, _) = test_deps().await;
    let provider =
        ScriptedProvider::new(vec![Ok(r#"call_tool("echo", {})"#.to_string())]);

    let agent = AgentDefinition::llm(
        "assistant",
        provider,
        None,
        vec!["broken".to_string()],
    )
    .unwrap();

    let err = run(agent, json!("go"), &deps, "s1").await.unwrap_err();
    assert!(matches!(err, EngineError::ToolExecution { .. }));
}

#[tokio::test]
async fn test_llm_provider_error_passes_through() {
    let (deps, _) = test_deps().await;
    let provider = ScriptedProvider::new(vec![Err(LlmError::Api {
        status: 500,
        message: "upstream down".to_string(),
    })]);

    let agent = AgentDefinition::llm("assistant", provider, None, vec![]).unwrap();

    let err = run(agent, json!("go"), &deps, "s1").await.unwrap_err();
    assert!(matches!(err, EngineError::Llm(LlmError::Api { status: 500, .. })));
}

#[tokio::test]
async fn test_invalid_definitions_fail_construction() {
    assert!(matches!(
        AgentDefinition::sequential("", vec![]),
        Err(EngineError::InvalidConfig(_))
    ));

    assert!(matches!(
        AgentDefinition::looping("l", vec![], |_, _, _| true, 0),
        Err(EngineError::InvalidConfig(_))
    ));

    let provider = ScriptedProvider::new(vec![]);
    assert!(matches!(
        AgentDefinition::llm("a", provider, None, vec!["".to_string()]),
        Err(EngineError::InvalidConfig(_))
    ));
}
