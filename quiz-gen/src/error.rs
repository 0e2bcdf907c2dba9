//! Error types for the `quiz-gen` crate.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors returned by a [`ChatModel`](crate::ChatModel).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    /// The provider throttled the request.
    #[error("Rate limited by provider{}", retry_hint(.retry_after))]
    RateLimited {
        /// Provider's hint for when to retry, if it sent one.
        retry_after: Option<Duration>,
    },

    /// The provider answered with a non-success status.
    #[error("Provider API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail from the response body.
        message: String,
    },

    /// The request never got a response (connection, DNS, timeout).
    #[error("Request failed: {0}")]
    Request(String),

    /// The provider's envelope could not be decoded.
    #[error("Failed to parse provider response: {0}")]
    ResponseParse(String),

    /// The client is misconfigured (missing key, bad URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default()
}

impl LlmError {
    /// Whether the provider asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. } | LlmError::Api { status: 429, .. })
    }
}

/// Errors raised while rendering a prompt template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PromptError {
    /// A field the template declares was not supplied.
    #[error("Template '{template}' is missing field '{field}'")]
    MissingField {
        /// Template name.
        template: &'static str,
        /// The absent field.
        field: String,
    },

    /// A supplied field, or a placeholder in the text, is not declared by the template.
    #[error("Template '{template}' does not recognise field '{field}'")]
    UnknownField {
        /// Template name.
        template: &'static str,
        /// The unrecognised field.
        field: String,
    },

    /// A `{` without a matching `}`.
    #[error("Template '{template}' has an unterminated placeholder at byte {offset}")]
    UnterminatedPlaceholder {
        /// Template name.
        template: &'static str,
        /// Byte offset of the opening brace.
        offset: usize,
    },
}

/// Coarse classification of a fatal generation failure, for callers that
/// need to tell "not enough material" apart from "try again later".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The model said the context could not support the questions.
    InsufficientContext,
    /// The model kept returning output that was not usable JSON.
    InvalidOutput,
    /// The model provider or the vector store failed.
    Upstream,
    /// The request itself was malformed.
    BadRequest,
}

/// Errors returned by question generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The model signalled that the retrieved context was insufficient.
    #[error("Insufficient context provided in the document")]
    InsufficientContext,

    /// Every attempt produced output that could not be parsed as JSON.
    #[error("LLM returned invalid JSON after {attempts} attempt(s): {message}")]
    InvalidOutput {
        /// Number of provider calls made.
        attempts: u32,
        /// The last parse error.
        message: String,
    },

    /// The provider failed on the final attempt.
    #[error("LLM provider failed after {attempts} attempt(s): {source}")]
    Upstream {
        /// Number of provider calls made.
        attempts: u32,
        /// The provider error.
        #[source]
        source: LlmError,
    },

    /// The generation request failed validation.
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    /// The generator configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The prompt template could not be rendered.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Retrieving context from the vector store failed.
    #[error(transparent)]
    Retrieval(#[from] quiz_rag::RagError),
}

impl GenerateError {
    /// Classify this error for the caller.
    pub fn reason(&self) -> FailureReason {
        match self {
            GenerateError::InsufficientContext => FailureReason::InsufficientContext,
            GenerateError::InvalidOutput { .. } => FailureReason::InvalidOutput,
            GenerateError::Upstream { .. } | GenerateError::Retrieval(_) => FailureReason::Upstream,
            GenerateError::InvalidRequest(_)
            | GenerateError::Config(_)
            | GenerateError::Prompt(_) => FailureReason::BadRequest,
        }
    }
}

/// Errors returned by single-question refinement.
#[derive(Debug, Error)]
pub enum RefineError {
    /// The provider call failed.
    #[error("Refinement request failed: {0}")]
    Llm(#[from] LlmError),

    /// The model's answer was not a usable question object.
    #[error("Refinement returned an invalid question: {0}")]
    InvalidOutput(String),

    /// The refinement prompt could not be rendered.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// A convenience result type for generation.
pub type Result<T> = std::result::Result<T, GenerateError>;
