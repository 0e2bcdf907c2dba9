//! Integration tests for question generation and its retry behaviour.

use std::sync::Arc;
use std::time::Duration;

use quiz_gen::{
    Difficulty, FailureReason, GenerateError, GenerationParams, LlmError, MockChatModel,
    QuestionGenerator, QuestionKind, QuestionMode,
};
use quiz_rag::RetrievedChunk;
use tokio::time::Instant;

const VALID: &str = r#"{"questions": [
    {"type": "text", "question": "Why flush before a snapshot?", "answer": "So the snapshot is consistent.", "source": "p.pdf (Page 1)"}
]}"#;

fn chunks() -> Vec<RetrievedChunk> {
    vec![RetrievedChunk::new(
        "p.pdf (Page 1)",
        "A snapshot taken while writes are buffered can miss data, so buffers are flushed first.",
    )]
}

fn text_params(count: u32) -> GenerationParams {
    GenerationParams::new(Difficulty::Easy, count, QuestionMode::Text)
}

fn generator(model: Arc<MockChatModel>) -> QuestionGenerator {
    QuestionGenerator::builder().model(model).build().unwrap()
}

#[tokio::test(start_paused = true)]
async fn malformed_twice_then_valid_takes_three_calls() {
    let model = Arc::new(
        MockChatModel::new().with_response("Here you go:").with_response("{\"questions\": [").with_response(VALID),
    );
    let start = Instant::now();

    let out = generator(model.clone()).generate_questions(&chunks(), &text_params(1)).await.unwrap();

    assert_eq!(model.call_count(), 3);
    assert_eq!(out.questions().unwrap().len(), 1);
    // two short backoffs
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn malformed_every_time_is_invalid_output() {
    let model = Arc::new(MockChatModel::new().with_fallback("not json"));

    let err = generator(model.clone()).generate_questions(&chunks(), &text_params(1)).await.unwrap_err();

    assert!(matches!(err, GenerateError::InvalidOutput { attempts: 3, .. }));
    assert_eq!(err.reason(), FailureReason::InvalidOutput);
    assert_eq!(model.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_waits_longer_than_other_errors() {
    let model = Arc::new(
        MockChatModel::new()
            .with_error(LlmError::RateLimited { retry_after: None })
            .with_error(LlmError::Api { status: 503, message: "unavailable".into() })
            .with_response(VALID),
    );
    let start = Instant::now();

    let out = generator(model.clone()).generate_questions(&chunks(), &text_params(1)).await.unwrap();

    assert_eq!(out.questions().unwrap().len(), 1);
    assert_eq!(model.call_count(), 3);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(6), "waited {waited:?}");
    assert!(waited < Duration::from_secs(7), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn provider_error_on_last_attempt_is_upstream() {
    let model = Arc::new(
        MockChatModel::new()
            .with_response("garbage")
            .with_response("garbage")
            .with_error(LlmError::Request("connection reset".into())),
    );

    let err = generator(model.clone()).generate_questions(&chunks(), &text_params(1)).await.unwrap_err();

    assert!(matches!(
        &err,
        GenerateError::Upstream { attempts: 3, source: LlmError::Request(_) }
    ));
    assert_eq!(err.reason(), FailureReason::Upstream);
}

#[tokio::test(start_paused = true)]
async fn insufficient_context_is_not_retried() {
    let model = Arc::new(MockChatModel::new().with_response("Insufficient context.").with_response(VALID));

    let err = generator(model.clone()).generate_questions(&chunks(), &text_params(3)).await.unwrap_err();

    assert!(matches!(err, GenerateError::InsufficientContext));
    assert_eq!(err.reason(), FailureReason::InsufficientContext);
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn end_to_end_text_questions_copy_sources() {
    let model = Arc::new(MockChatModel::new().with_response(
        r#"```json
{"questions": [
  {"type": "text", "question": "What happens if buffers are not flushed?", "answer": "The snapshot can miss data.", "explanation": "Buffered writes are not yet durable.", "source": "p.pdf (Page 1)", "context_quote": "A snapshot taken while writes are buffered can miss data"},
  {"type": "text", "question": "When should buffers be flushed?", "answer": "Before taking a snapshot.", "source": "p.pdf (Page 1)"},
  {"type": "text", "question": "", "answer": "dropped by the guardrail", "source": "p.pdf (Page 1)"}
]}
```"#,
    ));
    let chunks = chunks();

    let out = generator(model).generate_questions(&chunks, &text_params(3)).await.unwrap();
    let questions = out.questions().unwrap();

    assert!(questions.len() <= 3);
    assert_eq!(questions.len(), 2);
    let headers: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    for q in questions {
        assert_eq!(q.kind(), QuestionKind::Text);
        assert!(!q.question().is_empty());
        assert!(!q.answer().is_empty());
        assert!(headers.contains(&q.source()), "unexpected source {}", q.source());
    }
}

#[tokio::test]
async fn guardrail_drops_inconsistent_choices_in_order() {
    let model = Arc::new(MockChatModel::new().with_response(
        r#"[
  {"type": "mcq", "question": "First", "options": ["A", "B", "C"], "correct_answer": " b ", "source": "p.pdf (Page 1)"},
  {"type": "mcq", "question": "Second", "options": ["A", "B"], "correct_answer": "D", "source": "p.pdf (Page 1)"},
  {"type": "true_false", "question": "Third", "options": ["True", "False"], "correct_answer": "False", "source": "p.pdf (Page 1)"},
  {"type": "mcq", "question": "Fourth", "options": ["A"], "correct_answer": "A", "source": "p.pdf (Page 1)"}
]"#,
    ));
    let params = GenerationParams::new(Difficulty::Medium, 4, QuestionMode::Mixed).with_options(3);

    let out = generator(model).generate_questions(&chunks(), &params).await.unwrap();

    let kept: Vec<_> = out.questions().unwrap().iter().map(|q| (q.question().to_string(), q.kind())).collect();
    assert_eq!(
        kept,
        vec![("First".to_string(), QuestionKind::Mcq), ("Third".to_string(), QuestionKind::TrueFalse)]
    );
}

#[tokio::test]
async fn untagged_item_in_true_false_mode_needs_a_true_false_answer() {
    let model = Arc::new(MockChatModel::new().with_response(
        r#"[
  {"question": "Snapshots flush buffers?", "answer": "Maybe", "source": "p.pdf (Page 1)"},
  {"question": "Buffers are flushed first?", "answer": "true", "source": "p.pdf (Page 1)"}
]"#,
    ));
    let params = GenerationParams::new(Difficulty::Easy, 2, QuestionMode::TrueFalse);

    let out = generator(model).generate_questions(&chunks(), &params).await.unwrap();

    let questions = out.questions().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].kind(), QuestionKind::TrueFalse);
    assert_eq!(questions[0].question(), "Buffers are flushed first?");
    assert_eq!(questions[0].answer(), "True");
    assert_eq!(questions[0].options().unwrap(), ["True", "False"]);
}

#[tokio::test]
async fn true_false_with_other_options_is_dropped() {
    let model = Arc::new(MockChatModel::new().with_response(
        r#"[{"type": "true_false", "question": "Flush first?", "options": ["Yes", "No"], "correct_answer": "Yes", "source": "p.pdf (Page 1)"}]"#,
    ));
    let params = GenerationParams::new(Difficulty::Easy, 1, QuestionMode::TrueFalse);

    let out = generator(model).generate_questions(&chunks(), &params).await.unwrap();

    assert!(out.questions().unwrap().is_empty());
}

#[tokio::test]
async fn numeric_and_boolean_answers_survive_conversion() {
    let model = Arc::new(MockChatModel::new().with_response(
        r#"[
  {"question": "How many flushes?", "options": [1, 2, 3], "correct_answer": 2, "source": "p.pdf (Page 1)"},
  {"type": "true_false", "question": "Flush first?", "options": [true, false], "correct_answer": false, "source": "p.pdf (Page 1)"}
]"#,
    ));
    let params = GenerationParams::new(Difficulty::Easy, 2, QuestionMode::Mcq).with_options(3);

    let out = generator(model).generate_questions(&chunks(), &params).await.unwrap();

    let questions = out.questions().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].answer(), "2");
    assert_eq!(questions[0].options().unwrap(), ["1", "2", "3"]);
    assert_eq!(questions[1].kind(), QuestionKind::TrueFalse);
    assert_eq!(questions[1].answer(), "False");
}
