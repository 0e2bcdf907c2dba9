//! Integration tests for batch refinement.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quiz_gen::{
    ChatModel, ChatRequest, GeneratorConfig, LlmError, MockChatModel, Question, QuestionRefiner,
    RefineOutcome, TextQuestion,
};

fn question(n: usize) -> Question {
    Question::Text(TextQuestion {
        question: format!("Q{n}: how does replication lag show up?"),
        answer: format!("answer {n}"),
        explanation: None,
        source: format!("ops.pdf (Page {n})"),
        context_quote: None,
    })
}

/// Refines `Q{n}` to `Q{n} (harder)`; later items answer sooner, and item
/// `fail_on` errors. Tracks the peak number of calls in flight.
struct HarderModel {
    fail_on: Option<usize>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl HarderModel {
    fn new(fail_on: Option<usize>) -> Self {
        Self { fail_on, in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
    }
}

fn question_number(prompt: &str) -> usize {
    let start = prompt.find("\"Q").map(|i| i + 2).unwrap_or(0);
    prompt[start..].chars().take_while(char::is_ascii_digit).collect::<String>().parse().unwrap_or(0)
}

#[async_trait]
impl ChatModel for HarderModel {
    fn name(&self) -> &str {
        "harder"
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let n = question_number(&request.prompt);
        tokio::time::sleep(Duration::from_millis(100 - (n as u64 % 10) * 10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if Some(n) == self.fail_on {
            return Err(LlmError::Api { status: 500, message: "model crashed".into() });
        }
        Ok(format!(r#"{{"question": "Q{n} (harder)", "answer": "deeper answer {n}"}}"#))
    }
}

#[tokio::test(start_paused = true)]
async fn failed_item_falls_back_and_order_is_kept() {
    let model = Arc::new(HarderModel::new(Some(2)));
    let refiner = QuestionRefiner::new(model);
    let input: Vec<Question> = (0..5).map(question).collect();

    let output = refiner.batch_refine_questions(&input, "make harder").await;

    assert_eq!(output.len(), 5);
    assert_eq!(output[2], input[2]);
    for (i, q) in output.iter().enumerate().filter(|(i, _)| *i != 2) {
        assert_eq!(q.question(), format!("Q{i} (harder)"));
        // untouched fields come from the original
        assert_eq!(q.source(), format!("ops.pdf (Page {i})"));
    }
}

#[tokio::test(start_paused = true)]
async fn detailed_outcomes_report_fallbacks() {
    let model = Arc::new(HarderModel::new(Some(2)));
    let refiner = QuestionRefiner::new(model);
    let input: Vec<Question> = (0..5).map(question).collect();

    let outcomes = refiner.batch_refine_detailed(&input, "make harder").await;

    let refined: Vec<bool> = outcomes.iter().map(RefineOutcome::is_refined).collect();
    assert_eq!(refined, vec![true, true, false, true, true]);
    match &outcomes[2] {
        RefineOutcome::FellBack { original, error } => {
            assert_eq!(original, &input[2]);
            assert!(error.contains("model crashed"));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn at_most_five_refinements_in_flight() {
    let model = Arc::new(HarderModel::new(None));
    let refiner = QuestionRefiner::new(model.clone());
    let input: Vec<Question> = (0..12).map(question).collect();

    let output = refiner.batch_refine_questions(&input, "make harder").await;

    assert_eq!(output.len(), 12);
    assert_eq!(model.peak.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn concurrency_follows_config() {
    let model = Arc::new(HarderModel::new(None));
    let config = GeneratorConfig::builder().refine_concurrency(2).build().unwrap();
    let refiner = QuestionRefiner::new(model.clone()).with_config(config);
    let input: Vec<Question> = (0..6).map(question).collect();

    refiner.batch_refine_questions(&input, "make harder").await;

    assert_eq!(model.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn every_item_failing_returns_input_unchanged() {
    let model = Arc::new(MockChatModel::new().with_fallback("not json at all"));
    let refiner = QuestionRefiner::new(model.clone());
    let input: Vec<Question> = (0..3).map(question).collect();

    let output = refiner.batch_refine_questions(&input, "make harder").await;

    assert_eq!(output, input);
    assert_eq!(model.call_count(), 3);
}

#[tokio::test]
async fn empty_batch_makes_no_calls() {
    let model = Arc::new(MockChatModel::new());
    let refiner = QuestionRefiner::new(model.clone());

    assert!(refiner.batch_refine_questions(&[], "make harder").await.is_empty());
    assert_eq!(model.call_count(), 0);
}
