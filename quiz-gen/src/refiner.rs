//! Single and batched question refinement.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::error::RefineError;
use crate::llm::{ChatModel, ChatRequest};
use crate::parse::strip_code_fences;
use crate::prompt::refine_prompt;
use crate::question::Question;
use crate::sanitize::Sanitizer;

/// Per-slot result of a batch refinement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefineOutcome {
    /// The model returned a usable question.
    Refined { question: Question },
    /// Refinement failed; the slot holds the original question.
    FellBack { original: Question, error: String },
}

impl RefineOutcome {
    /// The question occupying this slot.
    pub fn question(&self) -> &Question {
        match self {
            RefineOutcome::Refined { question } => question,
            RefineOutcome::FellBack { original, .. } => original,
        }
    }

    /// Consume into the question occupying this slot.
    pub fn into_question(self) -> Question {
        match self {
            RefineOutcome::Refined { question } => question,
            RefineOutcome::FellBack { original, .. } => original,
        }
    }

    /// Whether the slot was refined.
    pub fn is_refined(&self) -> bool {
        matches!(self, RefineOutcome::Refined { .. })
    }
}

/// Rewrites questions according to a free-text instruction.
pub struct QuestionRefiner {
    model: Arc<dyn ChatModel>,
    config: GeneratorConfig,
    sanitizer: Sanitizer,
}

impl QuestionRefiner {
    /// Create a refiner with the default config and sanitizer.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model, config: GeneratorConfig::default(), sanitizer: Sanitizer::default() }
    }

    /// Use `config` for temperature and batch concurrency.
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the injection sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Refine one question with a single model call.
    ///
    /// The returned question keeps the original's variant when the model
    /// omits `"type"`, and the original's source when it omits `"source"`.
    ///
    /// # Errors
    ///
    /// Any provider, prompt or parse failure is returned as-is; there is no retry.
    pub async fn refine_question(
        &self,
        question: &Question,
        instruction: &str,
    ) -> Result<Question, RefineError> {
        let instruction = self.sanitizer.sanitize(instruction);
        let prompt = refine_prompt(question, &instruction)?;

        let raw = self.model.complete(ChatRequest::json(prompt, self.config.temperature)).await?;
        let value: Value = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| RefineError::InvalidOutput(format!("invalid JSON: {e}")))?;

        let object = match value {
            Value::Array(mut items) if items.len() == 1 => items.remove(0),
            Value::Object(mut obj) if obj.len() == 1 && obj.get("question").is_some_and(Value::is_object) => {
                obj.remove("question").unwrap_or(Value::Null)
            }
            other => other,
        };

        let mut refined = Question::from_llm_value(&object, Some(question.kind()))
            .map_err(RefineError::InvalidOutput)?;
        if refined.source().is_empty() {
            set_source(&mut refined, question.source());
        }

        debug!(kind = ?refined.kind(), "refined question");
        Ok(refined)
    }

    /// Refine every question independently, keeping input order.
    ///
    /// A slot whose refinement fails holds the original question.
    pub async fn batch_refine_questions(&self, questions: &[Question], instruction: &str) -> Vec<Question> {
        self.batch_refine_detailed(questions, instruction)
            .await
            .into_iter()
            .map(RefineOutcome::into_question)
            .collect()
    }

    /// Like [`batch_refine_questions`](Self::batch_refine_questions), but
    /// reports which slots fell back and why.
    ///
    /// At most `refine_concurrency` refinements run at once. Results land in
    /// a vector pre-sized to the input and indexed by input position, so
    /// completion order never affects output order.
    pub async fn batch_refine_detailed(&self, questions: &[Question], instruction: &str) -> Vec<RefineOutcome> {
        let mut outcomes: Vec<RefineOutcome> = questions
            .iter()
            .map(|q| RefineOutcome::FellBack { original: q.clone(), error: "not attempted".to_string() })
            .collect();

        let mut completions = futures::stream::iter(questions.iter().enumerate())
            .map(|(index, question)| async move {
                (index, self.refine_question(question, instruction).await)
            })
            .buffer_unordered(self.config.refine_concurrency.max(1));

        while let Some((index, result)) = completions.next().await {
            outcomes[index] = match result {
                Ok(question) => RefineOutcome::Refined { question },
                Err(e) => {
                    warn!(index, error = %e, "refinement failed; keeping original question");
                    RefineOutcome::FellBack { original: questions[index].clone(), error: e.to_string() }
                }
            };
        }

        let refined = outcomes.iter().filter(|o| o.is_refined()).count();
        info!(total = questions.len(), refined, fell_back = questions.len() - refined, "batch refinement finished");
        outcomes
    }
}

fn set_source(question: &mut Question, source: &str) {
    match question {
        Question::Text(q) => q.source = source.to_string(),
        Question::Mcq(q) | Question::TrueFalse(q) => q.source = source.to_string(),
    }
}
