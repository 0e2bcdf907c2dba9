//! Post-generation question filter.
//!
//! The [`Guardrail`] drops generated items that are structurally unusable or
//! contain blocklisted terms. It never fails a batch: rejected items are
//! logged and removed, the rest keep their order, and nothing is backfilled.

use std::fmt;

use serde_json::{Map, Value};
use tracing::warn;

use crate::question::{
    QuestionKind, canonical_true_false, is_true_false_pair, resolve_kind, scalar_text, text_field,
};

/// Terms that disqualify a question when found in its question, answer or
/// explanation text (case-insensitive substring match).
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "kill yourself",
    "self-harm instructions",
    "build a bomb",
    "make a bomb",
    "pornographic",
    "sexually explicit",
    "racial slur",
    "ethnic cleansing",
];

/// The single reason an item was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No non-empty `question` string (or the item is not an object).
    MissingQuestion,
    /// No non-empty `correct_answer` or `answer`.
    MissingAnswer,
    /// A choice item without an `options` array.
    MissingOptions,
    /// A choice item with fewer than two options.
    TooFewOptions(usize),
    /// An option that is not a string, number or boolean.
    InvalidOption,
    /// A true/false item whose options are not exactly True and False.
    NotTrueFalseOptions,
    /// The normalized answer matches none of the normalized options.
    AnswerNotInOptions,
    /// A blocklisted term appeared in the item's text.
    UnsafeTerm(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingQuestion => f.write_str("missing question text"),
            Rejection::MissingAnswer => f.write_str("missing answer"),
            Rejection::MissingOptions => f.write_str("choice question without options"),
            Rejection::TooFewOptions(n) => write!(f, "choice question with {n} option(s)"),
            Rejection::InvalidOption => f.write_str("option is not a string"),
            Rejection::NotTrueFalseOptions => f.write_str("true/false question with other options"),
            Rejection::AnswerNotInOptions => f.write_str("correct answer is not one of the options"),
            Rejection::UnsafeTerm(term) => write!(f, "contains blocklisted term '{term}'"),
        }
    }
}

/// Collapse whitespace runs and lower-case, so `" Paris  "` matches `"paris"`.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Filters generated question objects.
#[derive(Debug, Clone)]
pub struct Guardrail {
    name: String,
    blocklist: Vec<String>,
}

impl Default for Guardrail {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKLIST)
    }
}

impl Guardrail {
    /// Create a guardrail with a custom blocklist. Blank terms are ignored.
    pub fn new<I, S>(blocklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocklist = blocklist
            .into_iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self { name: "question_guardrail".to_string(), blocklist }
    }

    /// Create with a custom name, used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The guardrail's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check one item, returning the first reason it fails.
    pub fn check(&self, item: &Value) -> Result<(), Rejection> {
        self.check_for(item, None)
    }

    /// Check one item as the generator will read it.
    ///
    /// `hint` is the variant requested by the caller. An untagged item
    /// without options is then held to that variant's rules, and a true/false
    /// item without options is checked against `["True", "False"]`.
    pub fn check_for(&self, item: &Value, hint: Option<QuestionKind>) -> Result<(), Rejection> {
        let obj = item.as_object().ok_or(Rejection::MissingQuestion)?;

        let question = text_field(obj, &["question"]).ok_or(Rejection::MissingQuestion)?;
        let answer = text_field(obj, &["correct_answer", "answer"]).ok_or(Rejection::MissingAnswer)?;

        let kind = resolve_kind(obj, hint);
        if kind == QuestionKind::TrueFalse {
            if let Some(options) = option_texts(obj)? {
                if !is_true_false_pair(&options) {
                    return Err(Rejection::NotTrueFalseOptions);
                }
            }
            if canonical_true_false(&answer).is_none() {
                return Err(Rejection::AnswerNotInOptions);
            }
        } else if kind.is_choice() || is_choice(obj) {
            let options = option_texts(obj)?.ok_or(Rejection::MissingOptions)?;
            if options.len() < 2 {
                return Err(Rejection::TooFewOptions(options.len()));
            }
            let wanted = normalize(&answer);
            if !options.iter().any(|o| normalize(o) == wanted) {
                return Err(Rejection::AnswerNotInOptions);
            }
        }

        let mut haystacks = vec![normalize(&question), normalize(&answer)];
        haystacks.extend(["answer", "correct_answer", "explanation"].iter().filter_map(|k| {
            obj.get(*k).and_then(Value::as_str).map(normalize)
        }));
        if let Some(term) =
            self.blocklist.iter().find(|term| haystacks.iter().any(|h| h.contains(term.as_str())))
        {
            return Err(Rejection::UnsafeTerm(term.clone()));
        }

        Ok(())
    }

    /// Drop every item that fails [`check`](Self::check), preserving order.
    pub fn validate(&self, items: Vec<Value>) -> Vec<Value> {
        self.validate_for(items, None)
    }

    /// Drop every item that fails [`check_for`](Self::check_for) with `hint`.
    pub fn validate_for(&self, items: Vec<Value>, hint: Option<QuestionKind>) -> Vec<Value> {
        let total = items.len();
        let kept: Vec<Value> = items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match self.check_for(&item, hint) {
                Ok(()) => Some(item),
                Err(reason) => {
                    warn!(guardrail = %self.name, index, reason = %reason, "dropped generated question");
                    None
                }
            })
            .collect();

        if kept.len() < total {
            warn!(guardrail = %self.name, kept = kept.len(), dropped = total - kept.len(), "guardrail filtered questions");
        }
        kept
    }
}

fn is_choice(obj: &Map<String, Value>) -> bool {
    let tagged = obj
        .get("type")
        .and_then(Value::as_str)
        .map(|t| matches!(t.trim().to_ascii_lowercase().as_str(), "mcq" | "true_false" | "mixed"))
        .unwrap_or(false);
    tagged || obj.get("options").is_some_and(|o| !o.is_null())
}

/// The item's options as text, `None` when absent or null.
fn option_texts(obj: &Map<String, Value>) -> Result<Option<Vec<String>>, Rejection> {
    match obj.get("options") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(options)) => options
            .iter()
            .map(|o| scalar_text(o).ok_or(Rejection::InvalidOption))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(Rejection::MissingOptions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcq(answer: &str, options: &[&str]) -> Value {
        json!({"type": "mcq", "question": "Which?", "options": options, "correct_answer": answer, "source": "s"})
    }

    #[test]
    fn accepts_normalized_answer() {
        let g = Guardrail::default();
        assert_eq!(g.check(&mcq("  paris ", &["Paris", "Rome"])), Ok(()));
        assert_eq!(g.check(&mcq("New  York", &["new york", "Boston"])), Ok(()));
    }

    #[test]
    fn each_drop_has_one_reason() {
        let g = Guardrail::default();
        assert_eq!(g.check(&json!({"answer": "a"})), Err(Rejection::MissingQuestion));
        assert_eq!(g.check(&json!({"question": "  ", "answer": "a"})), Err(Rejection::MissingQuestion));
        assert_eq!(g.check(&json!({"question": "q"})), Err(Rejection::MissingAnswer));
        assert_eq!(
            g.check(&json!({"type": "mcq", "question": "q", "correct_answer": "a"})),
            Err(Rejection::MissingOptions)
        );
        assert_eq!(g.check(&mcq("a", &["a"])), Err(Rejection::TooFewOptions(1)));
        assert_eq!(g.check(&mcq("c", &["a", "b"])), Err(Rejection::AnswerNotInOptions));
        assert_eq!(g.check(&json!("just a string")), Err(Rejection::MissingQuestion));
    }

    #[test]
    fn mixed_tag_counts_as_choice() {
        let g = Guardrail::default();
        let item = json!({"type": "mixed", "question": "q", "correct_answer": "a"});
        assert_eq!(g.check(&item), Err(Rejection::MissingOptions));
    }

    #[test]
    fn text_item_needs_no_options() {
        let g = Guardrail::default();
        let item = json!({"type": "text", "question": "q", "answer": "a", "source": "s"});
        assert_eq!(g.check(&item), Ok(()));
    }

    #[test]
    fn blocklist_is_case_insensitive_substring() {
        let g = Guardrail::new(["Forbidden Word"]);
        let item = json!({
            "type": "text",
            "question": "q",
            "answer": "a",
            "explanation": "this has a FORBIDDEN   word inside"
        });
        assert_eq!(g.check(&item), Err(Rejection::UnsafeTerm("forbidden word".into())));
    }

    #[test]
    fn validate_preserves_order_without_backfill() {
        let g = Guardrail::default();
        let items = vec![
            json!({"question": "one", "answer": "1"}),
            json!({"question": "two"}),
            json!({"question": "three", "answer": "3"}),
            mcq("x", &["a", "b"]),
        ];
        let kept = g.validate(items);
        let texts: Vec<_> = kept.iter().map(|v| v["question"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[test]
    fn untagged_item_follows_requested_kind() {
        let g = Guardrail::default();
        let item = json!({"question": "Snapshots flush buffers?", "answer": "Maybe", "source": "p.pdf (Page 1)"});
        assert_eq!(g.check(&item), Ok(()));
        assert_eq!(g.check_for(&item, Some(QuestionKind::TrueFalse)), Err(Rejection::AnswerNotInOptions));
        assert_eq!(g.check_for(&item, Some(QuestionKind::Mcq)), Err(Rejection::MissingOptions));

        let yes = json!({"question": "q", "answer": " true "});
        assert_eq!(g.check_for(&yes, Some(QuestionKind::TrueFalse)), Ok(()));
    }

    #[test]
    fn true_false_needs_the_true_false_pair() {
        let g = Guardrail::default();
        let item = json!({"type": "true_false", "question": "q", "options": ["Yes", "No"], "correct_answer": "Yes"});
        assert_eq!(g.check(&item), Err(Rejection::NotTrueFalseOptions));
    }

    #[test]
    fn numeric_and_nested_options() {
        let g = Guardrail::default();
        let numbers = json!({"question": "1 + 1?", "options": [1, 2, 3], "correct_answer": 2});
        assert_eq!(g.check_for(&numbers, Some(QuestionKind::Mcq)), Ok(()));

        let nested = json!({"question": "q", "options": ["a", {"b": 1}], "correct_answer": "a"});
        assert_eq!(g.check(&nested), Err(Rejection::InvalidOption));
    }

    #[test]
    fn true_false_boolean_answer_matches() {
        let g = Guardrail::default();
        let item = json!({"type": "true_false", "question": "q", "options": ["True", "False"], "correct_answer": true});
        assert_eq!(g.check(&item), Ok(()));
    }
}
