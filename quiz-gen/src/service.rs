//! End-to-end quiz flows over an indexed document store.

use quiz_rag::Retriever;
use tracing::{info, instrument};

use crate::error::{RefineError, Result};
use crate::generator::{GeneratedQuestions, QuestionGenerator};
use crate::question::{BatchRefinementRequest, GenerationRequest, Question, RefinementRequest};
use crate::refiner::{QuestionRefiner, RefineOutcome};

/// Retrieval, generation and refinement behind one handle.
pub struct QuizService {
    retriever: Retriever,
    generator: QuestionGenerator,
    refiner: QuestionRefiner,
}

impl QuizService {
    pub fn new(retriever: Retriever, generator: QuestionGenerator, refiner: QuestionRefiner) -> Self {
        Self { retriever, generator, refiner }
    }

    /// Validate `request`, sample the document's chunks and generate questions.
    #[instrument(skip_all, fields(document.id = %request.document_id))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuestions> {
        request.validate()?;
        let chunks = self.retriever.retrieve_default(&request.document_id).await?;
        info!(chunk_count = chunks.len(), "retrieved context");
        self.generator.generate_questions(&chunks, &request.params).await
    }

    pub async fn refine(&self, request: &RefinementRequest) -> std::result::Result<Question, RefineError> {
        self.refiner.refine_question(&request.original_question, &request.instruction).await
    }

    pub async fn refine_batch(&self, request: &BatchRefinementRequest) -> Vec<Question> {
        self.refiner.batch_refine_questions(&request.questions, &request.instruction).await
    }

    pub async fn refine_batch_detailed(&self, request: &BatchRefinementRequest) -> Vec<RefineOutcome> {
        self.refiner.batch_refine_detailed(&request.questions, &request.instruction).await
    }
}
