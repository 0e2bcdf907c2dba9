//! Prompt-injection scrubbing for user-supplied text.

use regex::{Regex, RegexBuilder};

use crate::error::GenerateError;

/// Replacement written over every matched phrase.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Phrases stripped from user text before it reaches a prompt.
pub const DEFAULT_INJECTION_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "ignore the above",
    "disregard previous instructions",
    "forget your instructions",
    "system override",
    "system prompt",
    "you are now in developer mode",
    "jailbreak",
];

/// Replaces known injection phrases in free text with [`REDACTION_MARKER`].
///
/// Matching is case-insensitive, so every casing of a phrase is caught.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    pattern: Option<Regex>,
}

impl Sanitizer {
    /// Build a sanitizer for `phrases`. Blank phrases are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] if the combined pattern is too large
    /// to compile.
    pub fn new<I, S>(phrases: I) -> Result<Self, GenerateError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternation = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(&p))
            .collect::<Vec<_>>()
            .join("|");

        if alternation.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()
            .map_err(|e| GenerateError::Config(format!("invalid injection phrase list: {e}")))?;
        Ok(Self { pattern: Some(pattern) })
    }

    /// Return `text` with every phrase replaced.
    pub fn sanitize(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, REDACTION_MARKER).into_owned(),
            None => text.to_string(),
        }
    }

    /// Whether `text` contains any phrase.
    pub fn is_flagged(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        // escaped literals always compile
        Self::new(DEFAULT_INJECTION_PHRASES).unwrap_or(Self { pattern: None })
    }
}
