//! Decoding raw model output into question items.

use serde_json::Value;

/// Shape of a decoded model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    /// A bare array, or an object with a `questions` array.
    Questions(Vec<Value>),
    /// Valid JSON of any other shape, passed through unvalidated.
    Unrecognized(Value),
}

/// Remove a surrounding markdown code fence, with or without a language tag.
///
/// ```rust
/// use quiz_gen::parse::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
/// assert_eq!(strip_code_fences("  [1]  "), "[1]");
/// ```
pub fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string ("json", "JSON", ...) up to the first newline
    let body = match body.find('\n') {
        Some(nl) if body[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &body[nl + 1..],
        _ => body,
    };
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// Strip fences and decode `raw` as JSON, classifying its shape.
///
/// # Errors
///
/// Returns the `serde_json` error if the text is not valid JSON.
pub fn parse_output(raw: &str) -> Result<ParsedOutput, serde_json::Error> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))?;
    Ok(classify(value))
}

fn classify(value: Value) -> ParsedOutput {
    match value {
        Value::Array(items) => ParsedOutput::Questions(items),
        Value::Object(mut obj) => match obj.remove("questions") {
            Some(Value::Array(items)) => ParsedOutput::Questions(items),
            Some(other) => {
                obj.insert("questions".to_string(), other);
                ParsedOutput::Unrecognized(Value::Object(obj))
            }
            None => ParsedOutput::Unrecognized(Value::Object(obj)),
        },
        other => ParsedOutput::Unrecognized(other),
    }
}

/// Whether `raw` contains the insufficient-context marker, in any casing.
pub fn signals_insufficient_context(raw: &str) -> bool {
    raw.to_lowercase().contains(crate::prompt::INSUFFICIENT_CONTEXT_MARKER)
}
