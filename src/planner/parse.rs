//! Cleanup and parsing of raw model output
//!
//! Model answers are untrusted text. Everything that turns that text into
//! typed data goes through [`parse_json`].

use crate::error::PlanError;
use serde::de::DeserializeOwned;

/// Remove Markdown code fences (with or without a language tag)
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline.
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// The outermost `{...}` or `[...]` span, if the text has prose around it
fn json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output as `T` after stripping known wrapping artifacts
///
/// # Errors
/// * `PlanError::Malformed` when neither the stripped text nor the embedded
///   JSON span deserializes as `T`
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, PlanError> {
    let cleaned = strip_fences(raw);

    let first_error = match serde_json::from_str::<T>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(span) = json_span(cleaned).filter(|span| span.len() < cleaned.len()) {
        if let Ok(value) = serde_json::from_str::<T>(span) {
            return Ok(value);
        }
    }

    Err(PlanError::Malformed {
        reason: first_error.to_string(),
        raw: cleaned.to_string(),
    })
}
