//! Quiz question model and the request types that drive generation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GenerateError, Result};

/// Largest `count` a single generation request may ask for.
pub const MAX_QUESTION_COUNT: u32 = 20;

/// Allowed range for `options_count` on choice questions.
pub const OPTIONS_COUNT_RANGE: std::ops::RangeInclusive<u32> = 2..=6;

/// Options every true/false question carries.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// A short-answer question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextQuestion {
    /// The question text.
    pub question: String,
    /// The model answer.
    pub answer: String,
    /// Why the answer is right.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// The context header the question was drawn from, copied verbatim.
    #[serde(default)]
    pub source: String,
    /// The sentence from the context supporting the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_quote: Option<String>,
}

/// A question answered by picking one of `options`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceQuestion {
    /// The question text.
    pub question: String,
    /// Candidate answers, in display order.
    pub options: Vec<String>,
    /// The exact text of the correct option.
    pub correct_answer: String,
    /// Why the answer is right.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// The context header the question was drawn from, copied verbatim.
    #[serde(default)]
    pub source: String,
    /// The sentence from the context supporting the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_quote: Option<String>,
}

/// A generated quiz question, tagged by `"type"` on the wire.
///
/// ```rust
/// use quiz_gen::Question;
///
/// let q: Question = serde_json::from_str(
///     r#"{"type": "text", "question": "Why?", "answer": "Because.", "source": "a.pdf (Page 1)"}"#,
/// ).unwrap();
/// assert_eq!(q.answer(), "Because.");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    /// Short answer.
    Text(TextQuestion),
    /// Multiple choice.
    Mcq(ChoiceQuestion),
    /// True or false.
    TrueFalse(ChoiceQuestion),
}

/// The variant of a [`Question`], without its payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    Mcq,
    TrueFalse,
}

impl QuestionKind {
    /// Parse a wire tag. `"mixed"` and unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "text" => Some(QuestionKind::Text),
            "mcq" => Some(QuestionKind::Mcq),
            "true_false" => Some(QuestionKind::TrueFalse),
            _ => None,
        }
    }

    /// Whether answers are picked from a list of options.
    pub fn is_choice(self) -> bool {
        !matches!(self, QuestionKind::Text)
    }
}

impl Question {
    /// The variant of this question.
    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::Text(_) => QuestionKind::Text,
            Question::Mcq(_) => QuestionKind::Mcq,
            Question::TrueFalse(_) => QuestionKind::TrueFalse,
        }
    }

    /// The question text.
    pub fn question(&self) -> &str {
        match self {
            Question::Text(q) => &q.question,
            Question::Mcq(q) | Question::TrueFalse(q) => &q.question,
        }
    }

    /// The answer text (`answer` or `correct_answer`).
    pub fn answer(&self) -> &str {
        match self {
            Question::Text(q) => &q.answer,
            Question::Mcq(q) | Question::TrueFalse(q) => &q.correct_answer,
        }
    }

    /// The source header.
    pub fn source(&self) -> &str {
        match self {
            Question::Text(q) => &q.source,
            Question::Mcq(q) | Question::TrueFalse(q) => &q.source,
        }
    }

    /// The explanation, if any.
    pub fn explanation(&self) -> Option<&str> {
        match self {
            Question::Text(q) => q.explanation.as_deref(),
            Question::Mcq(q) | Question::TrueFalse(q) => q.explanation.as_deref(),
        }
    }

    /// The options of a choice question.
    pub fn options(&self) -> Option<&[String]> {
        match self {
            Question::Text(_) => None,
            Question::Mcq(q) | Question::TrueFalse(q) => Some(&q.options),
        }
    }

    /// Coerce a loosely-shaped model object into a [`Question`].
    ///
    /// The variant comes from the object's `"type"` tag, then `hint`, then
    /// the presence of `options`. `answer` and `correct_answer` are accepted
    /// interchangeably, numbers and booleans are read as text, and a missing
    /// `source` becomes empty.
    ///
    /// True/false questions always come out with `["True", "False"]` options
    /// and an answer spelled like one of them; any other option set or answer
    /// is an error. For multiple choice the answer is not checked against the
    /// options; the [`Guardrail`](crate::Guardrail) does that.
    pub fn from_llm_value(value: &Value, hint: Option<QuestionKind>) -> std::result::Result<Self, String> {
        let obj = value.as_object().ok_or_else(|| format!("expected a JSON object, got {}", kind_of(value)))?;
        let kind = resolve_kind(obj, hint);

        let question = required_str(obj, &["question"])?;
        let answer = required_str(obj, &["correct_answer", "answer"])?;
        let explanation = optional_str(obj, "explanation");
        let source = optional_str(obj, "source").unwrap_or_default();
        let context_quote = optional_str(obj, "context_quote");

        if kind == QuestionKind::Text {
            return Ok(Question::Text(TextQuestion {
                question,
                answer,
                explanation,
                source,
                context_quote,
            }));
        }

        let options = match obj.get("options") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    scalar_text(item)
                        .ok_or_else(|| format!("option must be a string, got {}", kind_of(item)))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None | Some(Value::Null) if kind == QuestionKind::TrueFalse => {
                TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect()
            }
            None | Some(Value::Null) => return Err("choice question has no options".to_string()),
            Some(other) => return Err(format!("options must be an array, got {}", kind_of(other))),
        };

        let (options, answer) = if kind == QuestionKind::TrueFalse {
            if !is_true_false_pair(&options) {
                return Err(format!("true/false options must be True and False, got {options:?}"));
            }
            let answer = canonical_true_false(&answer)
                .ok_or_else(|| format!("true/false answer must be True or False, got '{answer}'"))?;
            (TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect(), answer.to_string())
        } else {
            (options, answer)
        };

        let choice = ChoiceQuestion {
            question,
            options,
            correct_answer: answer,
            explanation,
            source,
            context_quote,
        };
        Ok(match kind {
            QuestionKind::TrueFalse => Question::TrueFalse(choice),
            _ => Question::Mcq(choice),
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn required_str(obj: &Map<String, Value>, keys: &[&str]) -> std::result::Result<String, String> {
    text_field(obj, keys).ok_or_else(|| format!("missing non-empty '{}'", keys.join("' or '")))
}

/// Variant an untyped model object turns into: its `"type"` tag, then
/// `hint`, then `Mcq` when it carries options, else `Text`.
pub(crate) fn resolve_kind(obj: &Map<String, Value>, hint: Option<QuestionKind>) -> QuestionKind {
    let has_options = obj.get("options").is_some_and(|o| !o.is_null());
    obj.get("type")
        .and_then(Value::as_str)
        .and_then(QuestionKind::from_tag)
        .or(hint)
        .unwrap_or(if has_options { QuestionKind::Mcq } else { QuestionKind::Text })
}

/// Read a scalar as text. Booleans become `"True"`/`"False"`.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First of `keys` holding a non-blank scalar.
pub(crate) fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(*k).and_then(scalar_text).filter(|s| !s.trim().is_empty()))
}

/// `"True"` or `"False"` for any case and spacing of either, else `None`.
pub(crate) fn canonical_true_false(answer: &str) -> Option<&'static str> {
    let wanted = crate::guardrail::normalize(answer);
    TRUE_FALSE_OPTIONS.iter().copied().find(|o| o.to_lowercase() == wanted)
}

/// Whether `options` is the true/false pair, in any order, case or spacing.
pub(crate) fn is_true_false_pair(options: &[String]) -> bool {
    let mut got: Vec<String> = options.iter().map(|o| crate::guardrail::normalize(o)).collect();
    got.sort();
    got == ["false", "true"]
}

/// How demanding the generated questions should be.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Lower-case name, as used in prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which question variants a generation request asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionMode {
    #[default]
    Text,
    Mcq,
    TrueFalse,
    /// A blend of the other three.
    Mixed,
}

impl QuestionMode {
    /// Snake-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionMode::Text => "text",
            QuestionMode::Mcq => "mcq",
            QuestionMode::TrueFalse => "true_false",
            QuestionMode::Mixed => "mixed",
        }
    }

    /// The variant every item should be coerced to, if the mode fixes one.
    pub fn kind(self) -> Option<QuestionKind> {
        match self {
            QuestionMode::Text => Some(QuestionKind::Text),
            QuestionMode::Mcq => Some(QuestionKind::Mcq),
            QuestionMode::TrueFalse => Some(QuestionKind::TrueFalse),
            QuestionMode::Mixed => None,
        }
    }
}

impl fmt::Display for QuestionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the generator needs besides the context chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationParams {
    pub difficulty: Difficulty,
    pub count: u32,
    pub mode: QuestionMode,
    /// Number of options for choice questions.
    #[serde(default, alias = "options", skip_serializing_if = "Option::is_none")]
    pub options_count: Option<u32>,
    /// Focus the questions on this topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl GenerationParams {
    /// Parameters with no option count and no topic.
    pub fn new(difficulty: Difficulty, count: u32, mode: QuestionMode) -> Self {
        Self { difficulty, count, mode, options_count: None, topic: None }
    }

    /// Set the number of options.
    pub fn with_options(mut self, options_count: u32) -> Self {
        self.options_count = Some(options_count);
        self
    }

    /// Set the focus topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// The option count the prompt should ask for.
    ///
    /// True/false is always 2; text mode never has options.
    pub fn effective_options(&self) -> Option<u32> {
        match self.mode {
            QuestionMode::Text => None,
            QuestionMode::TrueFalse => Some(2),
            QuestionMode::Mcq | QuestionMode::Mixed => self.options_count,
        }
    }

    /// The topic, if it is non-blank.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Reject mode/option combinations the generator cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidRequest`] if `count` is outside
    /// `1..=20`, `mcq` mode has no `options_count`, or `options_count` is
    /// outside `2..=6` for a mode that uses it.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 || self.count > MAX_QUESTION_COUNT {
            return Err(GenerateError::InvalidRequest(format!(
                "count must be between 1 and {MAX_QUESTION_COUNT}, got {}",
                self.count
            )));
        }
        if self.mode == QuestionMode::Mcq && self.options_count.is_none() {
            return Err(GenerateError::InvalidRequest(
                "mcq mode requires options_count".to_string(),
            ));
        }
        if self.mode != QuestionMode::TrueFalse {
            if let Some(n) = self.options_count {
                if !OPTIONS_COUNT_RANGE.contains(&n) {
                    return Err(GenerateError::InvalidRequest(format!(
                        "options_count must be between {} and {}, got {n}",
                        OPTIONS_COUNT_RANGE.start(),
                        OPTIONS_COUNT_RANGE.end()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A request to generate questions for an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub document_id: String,
    #[serde(flatten)]
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Build a request for `document_id`.
    pub fn new(document_id: impl Into<String>, params: GenerationParams) -> Self {
        Self { document_id: document_id.into(), params }
    }

    /// Validate the document id and the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.document_id.trim().is_empty() {
            return Err(GenerateError::InvalidRequest("document_id must not be empty".to_string()));
        }
        self.params.validate()
    }
}

/// A request to rewrite one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefinementRequest {
    pub original_question: Question,
    pub instruction: String,
}

/// A request to rewrite several questions with the same instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchRefinementRequest {
    pub questions: Vec<Question>,
    pub instruction: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_type_tag() {
        let q = Question::TrueFalse(ChoiceQuestion {
            question: "Caches are always coherent.".into(),
            options: vec!["True".into(), "False".into()],
            correct_answer: "False".into(),
            explanation: None,
            source: "notes.pdf (Page 3)".into(),
            context_quote: None,
        });
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "true_false");
        assert_eq!(value["correct_answer"], "False");
        assert!(value.get("explanation").is_none());
        assert_eq!(serde_json::from_value::<Question>(value).unwrap(), q);
    }

    #[test]
    fn coerces_untagged_choice_from_options() {
        let value = json!({
            "question": "Pick one",
            "options": ["a", "b", "c"],
            "answer": "b",
            "source": "s"
        });
        let q = Question::from_llm_value(&value, None).unwrap();
        assert_eq!(q.kind(), QuestionKind::Mcq);
        assert_eq!(q.answer(), "b");
        assert_eq!(q.options().unwrap().len(), 3);
    }

    #[test]
    fn hint_applies_only_without_tag() {
        let tagged = json!({"type": "text", "question": "q", "answer": "a"});
        assert_eq!(
            Question::from_llm_value(&tagged, Some(QuestionKind::Mcq)).unwrap().kind(),
            QuestionKind::Text
        );

        let untagged = json!({"question": "q", "correct_answer": "True"});
        let q = Question::from_llm_value(&untagged, Some(QuestionKind::TrueFalse)).unwrap();
        assert_eq!(q.options().unwrap(), ["True", "False"]);
    }

    #[test]
    fn true_false_is_canonicalized() {
        let loose = json!({"type": "true_false", "question": "q", "options": ["false ", "TRUE"], "correct_answer": true});
        let q = Question::from_llm_value(&loose, None).unwrap();
        assert_eq!(q.options().unwrap(), ["True", "False"]);
        assert_eq!(q.answer(), "True");

        let yes_no = json!({"type": "true_false", "question": "q", "options": ["Yes", "No"], "correct_answer": "Yes"});
        assert!(Question::from_llm_value(&yes_no, None).is_err());

        let maybe = json!({"question": "q", "answer": "Maybe"});
        assert!(Question::from_llm_value(&maybe, Some(QuestionKind::TrueFalse)).is_err());
    }

    #[test]
    fn numeric_answers_read_as_text() {
        let value = json!({"options": [1, 2, 3], "correct_answer": 2, "question": "1 + 1?"});
        let q = Question::from_llm_value(&value, Some(QuestionKind::Mcq)).unwrap();
        assert_eq!(q.answer(), "2");
        assert_eq!(q.options().unwrap(), ["1", "2", "3"]);
    }

    #[test]
    fn rejects_missing_answer_and_non_objects() {
        let err = Question::from_llm_value(&json!({"question": "q"}), None).unwrap_err();
        assert!(err.contains("correct_answer"));
        assert!(Question::from_llm_value(&json!(["q"]), None).is_err());
        assert!(
            Question::from_llm_value(&json!({"type": "mcq", "question": "q", "correct_answer": "a"}), None)
                .is_err()
        );
    }

    #[test]
    fn mcq_requires_options_count() {
        let params = GenerationParams::new(Difficulty::Easy, 5, QuestionMode::Mcq);
        assert!(matches!(params.validate(), Err(GenerateError::InvalidRequest(_))));
        assert!(params.with_options(4).validate().is_ok());
    }

    #[test]
    fn options_count_bounds() {
        let base = GenerationParams::new(Difficulty::Hard, 5, QuestionMode::Mixed);
        assert!(base.clone().with_options(1).validate().is_err());
        assert!(base.clone().with_options(7).validate().is_err());
        assert!(base.clone().with_options(6).validate().is_ok());

        // true/false ignores whatever count was sent
        let tf = GenerationParams::new(Difficulty::Hard, 5, QuestionMode::TrueFalse).with_options(9);
        assert!(tf.validate().is_ok());
        assert_eq!(tf.effective_options(), Some(2));
    }

    #[test]
    fn count_bounds() {
        assert!(GenerationParams::new(Difficulty::Easy, 0, QuestionMode::Text).validate().is_err());
        assert!(GenerationParams::new(Difficulty::Easy, 21, QuestionMode::Text).validate().is_err());
        assert!(GenerationParams::new(Difficulty::Easy, 20, QuestionMode::Text).validate().is_ok());
    }

    #[test]
    fn request_deserializes_flat() {
        let req: GenerationRequest = serde_json::from_value(json!({
            "document_id": "doc-1",
            "difficulty": "easy",
            "count": 3,
            "mode": "mcq",
            "options": 4
        }))
        .unwrap();
        assert_eq!(req.params.options_count, Some(4));
        assert_eq!(req.params.mode, QuestionMode::Mcq);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_topic_is_none() {
        let params = GenerationParams::new(Difficulty::Easy, 1, QuestionMode::Text).with_topic("  ");
        assert_eq!(params.topic(), None);
    }
}
