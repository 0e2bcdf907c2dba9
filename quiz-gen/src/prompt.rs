//! Prompt templates with an explicit field set.
//!
//! A [`PromptTemplate`] names every placeholder it contains. [`render`]
//! refuses to produce a prompt when a declared field is missing or an
//! undeclared one is supplied, so a typo never turns into a silently blank
//! section of the prompt.
//!
//! Placeholders are written `{name}`; literal braces are escaped as `{{` and
//! `}}`. Substituted values are inserted verbatim and never re-scanned.

use std::collections::BTreeMap;

use quiz_rag::RetrievedChunk;

use crate::error::PromptError;
use crate::question::{Difficulty, Question, QuestionMode};

/// Phrase the model is told to emit when the context cannot support questions.
pub const INSUFFICIENT_CONTEXT_MARKER: &str = "insufficient context";

/// A named prompt with the placeholders it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub text: &'static str,
    pub fields: &'static [&'static str],
}

/// Field values keyed by placeholder name.
pub type PromptFields<'a> = BTreeMap<&'a str, String>;

/// Substitute `fields` into `template`.
///
/// # Errors
///
/// - [`PromptError::UnknownField`] if a supplied field, or a placeholder in
///   the text, is not in `template.fields`.
/// - [`PromptError::MissingField`] if a declared field was not supplied.
/// - [`PromptError::UnterminatedPlaceholder`] for a `{` with no closing `}`.
///
/// # Example
///
/// ```rust
/// use quiz_gen::prompt::{PromptFields, PromptTemplate, render};
///
/// const GREETING: PromptTemplate =
///     PromptTemplate { name: "greeting", text: "Hi {who}, {{literal}}", fields: &["who"] };
///
/// let mut fields = PromptFields::new();
/// fields.insert("who", "Ada".to_string());
/// assert_eq!(render(&GREETING, &fields).unwrap(), "Hi Ada, {literal}");
/// ```
pub fn render(template: &PromptTemplate, fields: &PromptFields<'_>) -> Result<String, PromptError> {
    if let Some(unknown) = fields.keys().find(|k| !template.fields.iter().any(|f| *f == **k)) {
        return Err(PromptError::UnknownField {
            template: template.name,
            field: unknown.to_string(),
        });
    }
    if let Some(missing) = template.fields.iter().find(|f| !fields.contains_key(**f)) {
        return Err(PromptError::MissingField {
            template: template.name,
            field: missing.to_string(),
        });
    }

    let text = template.text;
    let mut out = String::with_capacity(text.len() + fields.values().map(String::len).sum::<usize>());
    let mut rest = text;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        let offset = text.len() - tail.len();
        let close = tail
            .find('}')
            .ok_or(PromptError::UnterminatedPlaceholder { template: template.name, offset })?;
        let name = &tail[1..close];
        let value = fields.get(name).ok_or_else(|| PromptError::UnknownField {
            template: template.name,
            field: name.to_string(),
        })?;
        out.push_str(value);
        rest = &tail[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Join retrieved chunks into the prompt context, one `[source]` block each.
pub fn compose_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("[{}]\n{}", c.source, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Question-generation prompt.
pub const QUESTION_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "question",
    fields: &["context", "difficulty", "count", "mode", "options", "topic_instruction"],
    text: r#"You are a senior engineer writing an assessment that checks whether a reader can apply the material below, not just recall it.

RULES
- Use ONLY the context below. If it cannot support the requested questions, reply with exactly: "Insufficient context."
- Frame questions as realistic problems: trade-offs, failure modes, diagnosis, design choices.
- No textbook definitions, no questions answerable by a text search, no "according to the text".
- Skip front and back matter (preface, table of contents, about the author); ask about the body.
- Every question needs an "explanation" that teaches why the answer is right.

{topic_instruction}

OUTPUT FORMATS
TEXT mode:
{{"questions": [{{"type": "text", "question": "...", "answer": "A 3-5 sentence model answer.", "explanation": "...", "source": "COPY_THE_HEADER_EXACTLY", "context_quote": "The sentence that supports the answer."}}]}}

MCQ mode ({options} options per question; wrong options must be plausible misconceptions):
{{"questions": [{{"type": "mcq", "question": "...", "options": ["...", "..."], "correct_answer": "The exact text of the correct option", "explanation": "...", "source": "COPY_THE_HEADER_EXACTLY", "context_quote": "..."}}]}}

TRUE_FALSE mode (options are exactly ["True", "False"]):
{{"questions": [{{"type": "true_false", "question": "...", "options": ["True", "False"], "correct_answer": "True", "explanation": "...", "source": "COPY_THE_HEADER_EXACTLY", "context_quote": "..."}}]}}

MIXED mode: roughly 60% MCQ, 20% TRUE_FALSE and 20% TEXT, each in its own format above.

SOURCE FIELD
Each context block starts with a header in square brackets, such as [notes.pdf (Page 2)] or [https://example.com/article].
Copy the header of the block you used into "source" exactly, without the brackets. Never invent page numbers.

CONTEXT
{context}

TASK
Generate {count} {difficulty} questions in {mode} mode.
Easy applies a single rule; medium analyses a relationship; hard combines several sections or edge cases.
Return ONLY valid JSON."#,
};

/// Single-question refinement prompt.
pub const REFINE_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "refine",
    fields: &["original_question", "instruction"],
    text: r#"You are an expert mentor revising one quiz question according to the user's request.

ORIGINAL QUESTION
{original_question}

USER INSTRUCTION
"{instruction}"

RULES
- Return the complete updated question as one JSON object with the same fields and the same "type".
- To make a question harder, add nuance, edge cases or trade-offs.
- To improve the explanation, rewrite "explanation" so it teaches more.
- If options change, "correct_answer" must still be exactly one of them.
- Keep "source" unchanged.

Return ONLY valid JSON."#,
};

/// Render [`QUESTION_TEMPLATE`]. `topic` must already be sanitized.
pub fn question_prompt(
    context: &str,
    difficulty: Difficulty,
    count: u32,
    mode: QuestionMode,
    options: Option<u32>,
    topic: Option<&str>,
) -> Result<String, PromptError> {
    let topic_instruction = topic
        .map(|t| {
            format!(
                "FOCUS: ask only about \"{t}\". Ignore parts of the context unrelated to it; \
                 if it is not covered at all, reply \"Insufficient context.\""
            )
        })
        .unwrap_or_default();

    let fields = PromptFields::from([
        ("context", context.to_string()),
        ("difficulty", difficulty.to_string()),
        ("count", count.to_string()),
        ("mode", mode.as_str().to_uppercase()),
        ("options", options.map(|n| n.to_string()).unwrap_or_default()),
        ("topic_instruction", topic_instruction),
    ]);
    render(&QUESTION_TEMPLATE, &fields)
}

/// Render [`REFINE_TEMPLATE`]. `instruction` must already be sanitized.
pub fn refine_prompt(original: &Question, instruction: &str) -> Result<String, PromptError> {
    let serialized = serde_json::to_string_pretty(original).unwrap_or_else(|_| format!("{original:?}"));
    let fields = PromptFields::from([
        ("original_question", serialized),
        ("instruction", instruction.to_string()),
    ]);
    render(&REFINE_TEMPLATE, &fields)
}
