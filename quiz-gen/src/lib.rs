//! # quiz-gen
//!
//! LLM-driven quiz generation, guardrails and refinement over context
//! retrieved by [`quiz_rag`].
//!
//! ## Overview
//!
//! The [`QuestionGenerator`] turns a handful of [`RetrievedChunk`]s into quiz
//! questions: it scrubs user text with a [`Sanitizer`], renders a prompt
//! from a fixed [`prompt`] template, calls a [`ChatModel`] under a
//! retry/backoff [`retry`] state machine, parses the reply and filters it
//! through a [`Guardrail`].
//!
//! The [`QuestionRefiner`] rewrites questions on request, one at a time or as
//! a bounded-concurrency batch that falls back to the original question for
//! any item that fails.
//!
//! [`QuizService`] wires a [`quiz_rag::Retriever`] in front of both.
//!
//! ## Providers
//!
//! - [`MockChatModel`] - scripted responses, always available
//! - `openai::OpenAIChatModel` - OpenAI chat completions (feature `openai`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quiz_gen::{Difficulty, GenerationParams, QuestionGenerator, QuestionMode};
//!
//! let generator = QuestionGenerator::builder().model(Arc::new(model)).build()?;
//! let params = GenerationParams::new(Difficulty::Easy, 3, QuestionMode::Text);
//! let questions = generator.generate_questions(&chunks, &params).await?;
//! ```
//!
//! [`RetrievedChunk`]: quiz_rag::RetrievedChunk

pub mod config;
pub mod error;
pub mod generator;
pub mod guardrail;
pub mod llm;
pub mod mock;
pub mod parse;
pub mod prompt;
pub mod question;
pub mod refiner;
pub mod retry;
pub mod sanitize;
pub mod service;

#[cfg(feature = "openai")]
pub mod openai;

pub use config::{GeneratorConfig, GeneratorConfigBuilder};
pub use error::{FailureReason, GenerateError, LlmError, PromptError, RefineError, Result};
pub use generator::{GeneratedQuestions, QuestionGenerator, QuestionGeneratorBuilder};
pub use guardrail::{Guardrail, Rejection};
pub use llm::{ChatModel, ChatRequest};
pub use mock::MockChatModel;
pub use parse::ParsedOutput;
pub use question::{
    BatchRefinementRequest, ChoiceQuestion, Difficulty, GenerationParams, GenerationRequest, Question,
    QuestionKind, QuestionMode, RefinementRequest, TextQuestion,
};
pub use refiner::{QuestionRefiner, RefineOutcome};
pub use retry::{AttemptOutcome, AttemptState, RetryPolicy};
pub use sanitize::Sanitizer;
pub use service::QuizService;
