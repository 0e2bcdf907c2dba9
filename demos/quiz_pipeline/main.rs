//! # Quiz Pipeline Example
//!
//! Indexes a small slide deck, generates questions from a representative
//! sample of it, then refines them as a batch.
//!
//! Uses `InMemoryVectorStore`, a deterministic hash embedder and a scripted
//! `MockChatModel`, so it runs with **zero API keys**. Build with
//! `--features openai` and set `OPENAI_API_KEY` to use a real model instead.
//!
//! Run: `cargo run --example quiz_pipeline`
//! Logs: `RUST_LOG=quiz_gen=debug,quiz_rag=debug cargo run --example quiz_pipeline`

use std::sync::Arc;

use quiz_gen::{
    ChatModel, Difficulty, GenerationParams, GenerationRequest, MockChatModel, QuestionGenerator,
    QuestionMode, QuestionRefiner, QuizService,
};
use quiz_rag::{
    DocumentSection, EmbeddingProvider, InMemoryVectorStore, Indexer, RagConfig, Retriever,
    new_document_id,
};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// HashEmbedder: deterministic embeddings so the demo needs no provider
// ---------------------------------------------------------------------------

struct HashEmbedder {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> quiz_rag::Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        Ok((0..self.dimensions).map(|i| ((hash.wrapping_add(i as u64)) as f32).sin()).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

const SLIDES: &[&str] = &[
    "A write-ahead log records every change before it is applied to the data files, so a crash never leaves a committed transaction half written.",
    "Checkpoints flush dirty pages and let the log be truncated; checkpointing too rarely makes recovery slow, too often wastes I/O bandwidth.",
    "Group commit batches several transactions into one fsync, trading a little latency for much higher throughput on slow disks.",
    "Replicas replay the primary's log; replication lag grows when replay is single-threaded and the primary accepts bursts of writes.",
    "Synchronous replication waits for a replica acknowledgement before commit, so it survives primary loss at the cost of higher commit latency.",
    "Logical decoding turns the log into a change stream, which is how change-data-capture pipelines feed search indexes and caches.",
    "Torn page writes are prevented by writing full page images to the log after each checkpoint, which inflates log volume.",
    "Archiving the log enables point-in-time recovery: restore a base backup, then replay archived segments up to the chosen moment.",
];

fn scripted_model() -> MockChatModel {
    let generated = serde_json::json!({
        "questions": [
            {
                "type": "mcq",
                "question": "Your nightly batch saturates the disk and commits stall. Which change raises throughput without weakening durability?",
                "options": ["Disable fsync", "Enable group commit", "Checkpoint every second", "Drop the replicas"],
                "correct_answer": "Enable group commit",
                "explanation": "Group commit amortises one fsync over many transactions; the others either lose durability or add I/O.",
                "source": "wal.pptx (Slide 3)",
                "context_quote": "Group commit batches several transactions into one fsync"
            },
            {
                "type": "true_false",
                "question": "Checkpointing as often as possible always improves overall performance.",
                "options": ["True", "False"],
                "correct_answer": "False",
                "explanation": "Frequent checkpoints shorten recovery but spend I/O bandwidth on flushing.",
                "source": "wal.pptx (Slide 2)"
            },
            {
                "type": "mcq",
                "question": "Which option is unsupported by the deck?",
                "options": ["A", "B"],
                "correct_answer": "C",
                "source": "wal.pptx (Slide 1)"
            }
        ]
    });
    let refined = serde_json::json!({
        "question": "During a bulk load on spinning disks, commit latency doubles while throughput stays flat. Which setting addresses the bottleneck while keeping every commit durable?",
        "options": ["Disable fsync", "Enable group commit", "Checkpoint every second", "Switch to asynchronous replication"],
        "correct_answer": "Enable group commit",
        "explanation": "The bottleneck is one fsync per commit; batching commits keeps durability and amortises the flush."
    });

    MockChatModel::new().with_response(generated.to_string()).with_response(refined.to_string()).with_fallback("not json")
}

fn chat_model() -> anyhow::Result<Arc<dyn ChatModel>> {
    #[cfg(feature = "openai")]
    if std::env::var("OPENAI_API_KEY").is_ok() {
        return Ok(Arc::new(quiz_gen::openai::OpenAIChatModel::from_env()?));
    }
    Ok(Arc::new(scripted_model()))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // -- 1. Index the deck ------------------------------------------------
    // Small windows so each slide becomes a single chunk.
    let config = RagConfig::builder().chunk_size(60).chunk_overlap(10).sample_size(4).build()?;
    let store = Arc::new(InMemoryVectorStore::new());
    let indexer = Indexer::builder()
        .config(config.clone())
        .embedding_provider(Arc::new(HashEmbedder { dimensions: 32 }))
        .vector_store(store.clone())
        .build()?;
    indexer.ensure_collection().await?;

    let document_id = new_document_id();
    let sections: Vec<DocumentSection> = SLIDES
        .iter()
        .enumerate()
        .map(|(i, text)| DocumentSection::new(format!("wal.pptx (Slide {})", i + 1), *text))
        .collect();
    let report = indexer.index_document(&document_id, &sections).await?;
    println!("Indexed {} chunks from {} slides\n", report.chunk_count, report.section_count);

    // -- 2. Generate --------------------------------------------------------
    let model = chat_model()?;
    let quiz = QuizService::new(
        Retriever::new(config, store),
        QuestionGenerator::builder().model(model.clone()).build()?,
        QuestionRefiner::new(model),
    );

    let request = GenerationRequest::new(
        document_id.clone(),
        GenerationParams::new(Difficulty::Medium, 3, QuestionMode::Mixed).with_options(4),
    );
    let questions = quiz.generate(&request).await?.into_questions();

    println!("Generated {} question(s):", questions.len());
    for (i, q) in questions.iter().enumerate() {
        println!("  {}. [{:?}] {}", i + 1, q.kind(), q.question());
        println!("     answer: {}  (source: {})", q.answer(), q.source());
    }

    // -- 3. Refine ------------------------------------------------------------
    let batch = quiz_gen::BatchRefinementRequest { questions, instruction: "make harder".into() };
    let outcomes = quiz.refine_batch_detailed(&batch).await;

    println!("\nRefinement:");
    for (i, outcome) in outcomes.iter().enumerate() {
        let status = if outcome.is_refined() { "refined" } else { "kept original" };
        println!("  {}. {status}: {}", i + 1, outcome.question().question());
    }

    Ok(())
}
