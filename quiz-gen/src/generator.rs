//! Question generation: prompt, call, parse, guard.
//!
//! # Example
//!
//! ```rust,ignore
//! use quiz_gen::{Difficulty, GenerationParams, QuestionGenerator, QuestionMode};
//!
//! let generator = QuestionGenerator::builder().model(Arc::new(my_model)).build()?;
//! let params = GenerationParams::new(Difficulty::Easy, 3, QuestionMode::Text);
//! let questions = generator.generate_questions(&chunks, &params).await?;
//! ```

use std::sync::Arc;

use quiz_rag::RetrievedChunk;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::GeneratorConfig;
use crate::error::{GenerateError, Result};
use crate::guardrail::Guardrail;
use crate::llm::{ChatModel, ChatRequest};
use crate::parse::{ParsedOutput, parse_output, signals_insufficient_context};
use crate::prompt::{compose_context, question_prompt};
use crate::question::{GenerationParams, Question};
use crate::retry::{AttemptOutcome, RetryPolicy, run_attempts};
use crate::sanitize::Sanitizer;

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedQuestions {
    /// Items that passed the guardrail, in model order. May be shorter than
    /// the requested count.
    Validated(Vec<Question>),
    /// Well-formed JSON the model returned in an unexpected shape, unvalidated.
    Unrecognized(Value),
}

impl GeneratedQuestions {
    /// The validated questions, or `None` for pass-through output.
    pub fn questions(&self) -> Option<&[Question]> {
        match self {
            GeneratedQuestions::Validated(questions) => Some(questions),
            GeneratedQuestions::Unrecognized(_) => None,
        }
    }

    /// Consume into the validated questions; pass-through output yields none.
    pub fn into_questions(self) -> Vec<Question> {
        match self {
            GeneratedQuestions::Validated(questions) => questions,
            GeneratedQuestions::Unrecognized(_) => Vec::new(),
        }
    }
}

/// Generates quiz questions from retrieved context with a [`ChatModel`].
pub struct QuestionGenerator {
    model: Arc<dyn ChatModel>,
    config: GeneratorConfig,
    sanitizer: Sanitizer,
    guardrail: Guardrail,
}

impl QuestionGenerator {
    /// Create a new [`QuestionGeneratorBuilder`].
    pub fn builder() -> QuestionGeneratorBuilder {
        QuestionGeneratorBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate questions grounded in `chunks`.
    ///
    /// The provider is called up to `max_attempts` times; see
    /// [`retry`](crate::retry) for the backoff rules. An explicit
    /// "insufficient context" reply ends the call at once.
    ///
    /// # Errors
    ///
    /// - [`GenerateError::InvalidRequest`] if `params` fail validation.
    /// - [`GenerateError::InsufficientContext`] if `chunks` is empty or the
    ///   model says the context is not enough.
    /// - [`GenerateError::InvalidOutput`] if no attempt produced valid JSON.
    /// - [`GenerateError::Upstream`] if the provider failed for good.
    pub async fn generate_questions(
        &self,
        chunks: &[RetrievedChunk],
        params: &GenerationParams,
    ) -> Result<GeneratedQuestions> {
        params.validate()?;
        if chunks.is_empty() {
            warn!("no context chunks supplied");
            return Err(GenerateError::InsufficientContext);
        }

        let topic = params.topic().map(|t| self.sanitizer.sanitize(t));
        let context = compose_context(chunks);
        let prompt = question_prompt(
            &context,
            params.difficulty,
            params.count,
            params.mode,
            params.effective_options(),
            topic.as_deref(),
        )?;

        info!(
            model = self.model.name(),
            chunk_count = chunks.len(),
            count = params.count,
            mode = %params.mode,
            difficulty = %params.difficulty,
            "generating questions"
        );

        let policy = RetryPolicy::from_config(&self.config);
        let parsed = run_attempts(&policy, |_attempt| {
            let request = ChatRequest::json(prompt.clone(), self.config.temperature);
            async move {
                match self.model.complete(request).await {
                    Ok(raw) => classify_response(&raw),
                    Err(e) => AttemptOutcome::ProviderError(e),
                }
            }
        })
        .await?;

        match parsed {
            ParsedOutput::Questions(items) => {
                let received = items.len();
                let questions: Vec<Question> = self
                    .guardrail
                    .validate_for(items, params.mode.kind())
                    .iter()
                    .filter_map(|item| match Question::from_llm_value(item, params.mode.kind()) {
                        Ok(question) => Some(question),
                        Err(e) => {
                            warn!(error = %e, "dropped unconvertible question");
                            None
                        }
                    })
                    .collect();
                info!(received, kept = questions.len(), "generated questions");
                Ok(GeneratedQuestions::Validated(questions))
            }
            ParsedOutput::Unrecognized(value) => {
                warn!("model output had an unexpected shape; returning it unvalidated");
                Ok(GeneratedQuestions::Unrecognized(value))
            }
        }
    }
}

/// Map one raw response to an attempt outcome.
///
/// The insufficient-context marker only counts when the response is not a
/// usable question list, so a valid question that mentions the phrase is kept.
fn classify_response(raw: &str) -> AttemptOutcome<ParsedOutput> {
    match parse_output(raw) {
        Ok(ParsedOutput::Questions(items)) => AttemptOutcome::Parsed(ParsedOutput::Questions(items)),
        _ if signals_insufficient_context(raw) => AttemptOutcome::InsufficientContext,
        Ok(other) => AttemptOutcome::Parsed(other),
        Err(e) => AttemptOutcome::Malformed(e.to_string()),
    }
}

/// Builder for constructing a [`QuestionGenerator`].
///
/// `model` is required; everything else has a default.
#[derive(Default)]
pub struct QuestionGeneratorBuilder {
    model: Option<Arc<dyn ChatModel>>,
    config: Option<GeneratorConfig>,
    sanitizer: Option<Sanitizer>,
    guardrail: Option<Guardrail>,
}

impl QuestionGeneratorBuilder {
    /// Set the chat model.
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the default injection sanitizer.
    pub fn sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Replace the default guardrail.
    pub fn guardrail(mut self, guardrail: Guardrail) -> Self {
        self.guardrail = Some(guardrail);
        self
    }

    /// Build the [`QuestionGenerator`].
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] if no model is set or the config is invalid.
    pub fn build(self) -> Result<QuestionGenerator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let model =
            self.model.ok_or_else(|| GenerateError::Config("model is required".to_string()))?;
        Ok(QuestionGenerator {
            model,
            config,
            sanitizer: self.sanitizer.unwrap_or_default(),
            guardrail: self.guardrail.unwrap_or_default(),
        })
    }
}
