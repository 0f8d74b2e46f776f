//! LLM-directed composite
//!
//! Builds the conversation (system prompt, session history, new input), asks
//! the provider for a completion, and interprets the reply through the
//! directive parser: a well-formed tool-call directive runs the named tool
//! and the run concludes with the tool's result; anything else is the final
//! answer. One directive per turn; provider errors propagate unwrapped.

use std::sync::Arc;

use serde_json::Value;

use super::definition::RunStatus;
use super::{CompositeOutcome, EngineDeps};
use crate::domain::{ChatMessage, Event, EventAuthor, ToolContext};
use crate::error::{EngineError, EngineResult};
use crate::llm::{Directive, GenerateOptions, LlmProvider};
use crate::memory::SessionContext;

pub(crate) async fn run(
    system_prompt: Option<&str>,
    provider: Arc<dyn LlmProvider>,
    allowed_tools: &[String],
    input: Value,
    ctx: &mut SessionContext,
    deps: &EngineDeps,
) -> EngineResult<CompositeOutcome> {
    let mut messages = Vec::new();

    if let Some(prompt) = system_prompt {
        messages.push(ChatMessage::system(prompt));
    }

    for event in ctx.history().await? {
        if let Some(message) = message_for(&event) {
            messages.push(message);
        }
    }

    let input_text = input_text(&input);
    messages.push(ChatMessage::user(&input_text));
    ctx.append_event(ctx.event(EventAuthor::User).with_content(&input_text))
        .await?;

    tracing::debug!(
        provider = %provider.name(),
        model = %provider.model(),
        session = %ctx.session_id(),
        "requesting completion"
    );

    let reply = provider
        .generate(messages, GenerateOptions::default())
        .await?;

    match Directive::parse(&reply) {
        Directive::ToolCall { name, args } => {
            if !allowed_tools.is_empty() && !allowed_tools.iter().any(|t| t == &name) {
                return Err(EngineError::ToolExecution {
                    tool: name,
                    reason: "tool not available to this agent".to_string(),
                });
            }

            let tool = deps
                .tools
                .lookup(&name)
                .await
                .ok_or_else(|| EngineError::ToolExecution {
                    tool: name.clone(),
                    reason: "tool not found".to_string(),
                })?;

            ctx.append_event(
                ctx.event(EventAuthor::Model)
                    .with_content(&reply)
                    .with_tool_call(&name, args.clone()),
            )
            .await?;

            let context = ToolContext {
                session_id: ctx.session_id().to_string(),
            };
            let result =
                tool.execute(args, context)
                    .await
                    .map_err(|e| EngineError::ToolExecution {
                        tool: name.clone(),
                        reason: e.to_string(),
                    })?;

            ctx.append_event(ctx.event(EventAuthor::Tool).with_tool_result(result.clone()))
                .await?;

            Ok(CompositeOutcome {
                output: result,
                combined: None,
                iterations: None,
                status: RunStatus::ToolCallCompleted,
            })
        }
        Directive::FinalAnswer { text } => {
            ctx.append_event(ctx.event(EventAuthor::Model).with_content(&text))
                .await?;

            Ok(CompositeOutcome {
                output: Value::String(text),
                combined: None,
                iterations: None,
                status: RunStatus::Completed,
            })
        }
    }
}

/// Map a history event to a conversation message. Tool events carry their
/// results as JSON; agent and custom events are not part of the conversation.
fn message_for(event: &Event) -> Option<ChatMessage> {
    match &event.author {
        EventAuthor::User => Some(ChatMessage::user(&event.content)),
        EventAuthor::Model => Some(ChatMessage::assistant(&event.content)),
        EventAuthor::Tool => {
            let content = if event.tool_results.is_empty() {
                event.content.clone()
            } else {
                serde_json::to_string(&event.tool_results).unwrap_or_default()
            };
            Some(ChatMessage::tool(content))
        }
        EventAuthor::Agent | EventAuthor::Custom(_) => None,
    }
}

fn input_text(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
