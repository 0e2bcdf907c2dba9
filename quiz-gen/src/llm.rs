//! Chat-model trait the generator and refiner talk to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// System instruction sent with every JSON-producing call.
pub const STRICT_JSON_SYSTEM: &str = "You are a strict JSON API. Return ONLY valid JSON. \
     Do not include explanations, markdown, or extra text.";

/// A single chat completion request: one system instruction and one user prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The system instruction.
    pub system: String,
    /// The user prompt.
    pub prompt: String,
    /// Ask the provider to force a JSON object response.
    pub json_mode: bool,
    /// Sampling temperature.
    pub temperature: f32,
}

impl ChatRequest {
    /// A strict-JSON request for `prompt` at `temperature`.
    pub fn json(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: STRICT_JSON_SYSTEM.to_string(),
            prompt: prompt.into(),
            json_mode: true,
            temperature,
        }
    }
}

/// A chat-completion provider returning the raw text of the first choice.
///
/// Implementations must classify throttling as [`LlmError::RateLimited`] (or
/// an [`LlmError::Api`] with status 429) so callers can back off longer.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name, for logs.
    fn name(&self) -> &str;

    /// Run one completion and return the raw message content.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}
