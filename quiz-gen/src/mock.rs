//! Scripted chat model for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{ChatModel, ChatRequest};

/// A [`ChatModel`] that replays queued responses and records every request.
///
/// Responses are consumed in call order. Prompts matching a
/// [`with_failure_when`](Self::with_failure_when) marker fail first. Once the queue is empty the
/// fallback response (if any) is returned for every further call; without a
/// fallback an exhausted mock answers with [`LlmError::Request`].
///
/// # Example
///
/// ```rust
/// use quiz_gen::{ChatModel, ChatRequest, LlmError, MockChatModel};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let model = MockChatModel::new()
///     .with_response("not json")
///     .with_error(LlmError::RateLimited { retry_after: None })
///     .with_response(r#"{"questions": []}"#);
///
/// assert_eq!(model.complete(ChatRequest::json("p", 0.2)).await.unwrap(), "not json");
/// assert!(model.complete(ChatRequest::json("p", 0.2)).await.is_err());
/// assert_eq!(model.call_count(), 2);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MockChatModel {
    name: String,
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    failures: Vec<(String, LlmError)>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatModel {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self { name: "mock".to_string(), ..Default::default() }
    }

    /// Queue a successful response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a provider error.
    pub fn with_error(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    /// Response returned once the queue is exhausted.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Fail every call whose prompt contains `marker`, without consuming the script.
    pub fn with_failure_when(mut self, marker: impl Into<String>, error: LlmError) -> Self {
        self.failures.push((marker.into(), error));
        self
    }

    fn push(&self, item: Result<String, LlmError>) {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(item);
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every request received, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let failure = self
            .failures
            .iter()
            .find(|(marker, _)| request.prompt.contains(marker.as_str()))
            .map(|(_, error)| error.clone());
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request);
        if let Some(error) = failure {
            return Err(error);
        }
        let next = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(item) => item,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::Request("mock script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_then_fallback() {
        let model = MockChatModel::new().with_response("one").with_fallback("rest");
        assert_eq!(model.complete(ChatRequest::json("a", 0.2)).await.unwrap(), "one");
        assert_eq!(model.complete(ChatRequest::json("b", 0.2)).await.unwrap(), "rest");
        assert_eq!(model.complete(ChatRequest::json("c", 0.2)).await.unwrap(), "rest");
        let prompts: Vec<_> = model.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn exhausted_without_fallback_errors() {
        let model = MockChatModel::new();
        let err = model.complete(ChatRequest::json("a", 0.2)).await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
    }

    #[tokio::test]
    async fn marker_failure_skips_script() {
        let model = MockChatModel::new()
            .with_response("kept")
            .with_failure_when("poison", LlmError::Api { status: 500, message: "boom".into() });
        assert!(model.complete(ChatRequest::json("poison pill", 0.2)).await.is_err());
        assert_eq!(model.complete(ChatRequest::json("fine", 0.2)).await.unwrap(), "kept");
        assert_eq!(model.call_count(), 2);
    }
}
