//! OpenAI chat-completions model.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::LlmError;
use crate::llm::{ChatModel, ChatRequest};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// A [`ChatModel`] backed by the OpenAI chat completions API.
///
/// JSON mode is requested with `response_format: {"type": "json_object"}`.
/// HTTP 429 becomes [`LlmError::RateLimited`], carrying the `Retry-After`
/// header when the server sends one.
///
/// # Example
///
/// ```rust,ignore
/// use quiz_gen::openai::OpenAIChatModel;
///
/// let model = OpenAIChatModel::from_env()?;
/// let text = model.complete(ChatRequest::json("Say {}", 0.2)).await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAIChatModel {
    /// Create a model client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::Config("API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            url: OPENAI_CHAT_URL.into(),
        })
    }

    /// Create a client from `OPENAI_API_KEY`; `LLM_MODEL` overrides the model.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Config("OPENAI_API_KEY environment variable not set".into()))?;
        let model = Self::new(api_key)?;
        Ok(match std::env::var("LLM_MODEL") {
            Ok(name) if !name.is_empty() => model.with_model(name),
            _ => model,
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible chat completions endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": request.temperature,
        });
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Map a non-success status and body to an [`LlmError`].
fn map_http_error(status: u16, retry_after: Option<Duration>, body: &str) -> LlmError {
    if status == 429 {
        return LlmError::RateLimited { retry_after };
    }
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    LlmError::Api { status, message }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        debug!(model = %self.model, prompt_len = request.prompt.len(), json_mode = request.json_mode, "chat completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "request failed");
                LlmError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let err = map_http_error(status.as_u16(), retry_after, &body);
            error!(model = %self.model, status = status.as_u16(), error = %err, "API error");
            return Err(err);
        }

        let body: ChatResponse =
            response.json().await.map_err(|e| LlmError::ResponseParse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ResponseParse("response contained no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(OpenAIChatModel::new(""), Err(LlmError::Config(_))));
    }

    #[test]
    fn json_mode_sets_response_format() {
        let model = OpenAIChatModel::new("sk-test").unwrap();
        let body = model.request_body(&ChatRequest::json("hi", 0.2));
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["messages"][0]["role"], "system");

        let mut plain = ChatRequest::json("hi", 0.2);
        plain.json_mode = false;
        assert!(model.request_body(&plain).get("response_format").is_none());
    }

    #[test]
    fn maps_429_to_rate_limited() {
        let err = map_http_error(429, Some(Duration::from_secs(3)), "");
        assert_eq!(err, LlmError::RateLimited { retry_after: Some(Duration::from_secs(3)) });
        assert!(err.is_rate_limited());
    }

    #[test]
    fn extracts_error_message() {
        let err = map_http_error(400, None, r#"{"error": {"message": "bad model"}}"#);
        assert_eq!(err, LlmError::Api { status: 400, message: "bad model".into() });
        let err = map_http_error(502, None, "gateway");
        assert_eq!(err, LlmError::Api { status: 502, message: "gateway".into() });
    }
}
