//! # Talos - Agent Execution Engine
//!
//! Talos interprets declarative pipelines of heterogeneous steps (functions,
//! tool invocations, transforms, sub-agent delegation) against mutable
//! per-session memory, under composition policies with bounded-time execution
//! and structured failure propagation.
//!
//! ## Features
//!
//! - **4 Composite Policies**: Sequential, Parallel, Loop, LLM-directed
//! - **Typed Steps**: a closed sum type over function, tool, transform, and
//!   agent steps, validated at construction time
//! - **Session Memory**: event history plus cross-run state, with in-memory
//!   and file-based backends
//! - **Process Boundary**: one actor per agent instance serializing runs
//!   FIFO, with per-call timeouts and panic isolation
//! - **Directive Protocol**: LLM replies parsed into tool calls or final
//!   answers by an isolated, well-tested parser
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use talos::engine::{AgentDefinition, RunOptions, Runtime, StepSpec};
//! use talos::memory::InMemoryStore;
//! use talos::tools::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Runtime::new(
//!         Arc::new(InMemoryStore::new(1000)),
//!         Arc::new(ToolRegistry::new()),
//!     );
//!
//!     let agent = AgentDefinition::sequential(
//!         "doubler",
//!         vec![StepSpec::function("double", |input| {
//!             let n = input.as_i64().unwrap_or(0);
//!             Ok(json!(n * 2))
//!         })],
//!     )?;
//!
//!     let runner = runtime.spawn(agent);
//!     let result = runner.run(json!(21), RunOptions::default()).await?;
//!     assert_eq!(result.output, json!(42));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: shared types and the tool port
//! - **Engine**: step interpreter, composite policies, process boundary
//! - **Memory**: session store trait and backends
//! - **Llm**: provider port and directive parsing
//! - **Tools**: the dependency-injected tool registry
//! - **Config**: settings loaded from `talos.toml` and the environment

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod llm;
pub mod memory;
pub mod tools;

pub use engine::{
    AgentDefinition, AgentKind, AgentRunner, RunOptions, RunResult, RunStatus, Runtime, StepOutput,
    StepSpec,
};
pub use error::{EngineError, EngineResult, LlmError, LlmResult, StepError, StepErrorKind};
