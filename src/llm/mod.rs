//! LLM provider port and directive parsing
//!
//! The engine consumes providers through the [`LlmProvider`] trait; concrete
//! HTTP clients live outside this crate. Provider replies are free text and
//! are interpreted by the [`Directive`] parser.

mod directive;

pub use directive::Directive;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;
use crate::error::LlmResult;

/// Options for a single generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Generate a completion for the given conversation
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerateOptions,
    ) -> LlmResult<String>;
}
