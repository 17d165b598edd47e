//! Turning raw model text into a [`StructuredResult`].
//!
//! Neither parser ever fails: malformed output degrades to a diagnostic
//! shape that still satisfies the result invariants.

use crate::types::{FormField, StructuredResult};
use serde_json::Value;

const RAW_RESPONSE_PREVIEW: usize = 500;
const PARSE_ERROR_PREVIEW: usize = 300;

/// Strip a surrounding markdown code fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a free-form JSON answer.
///
/// A JSON object is returned as decoded. Anything else, including valid
/// JSON that is not an object, becomes `{"raw_text": <cleaned text>}`.
pub fn parse_response(raw: &str) -> StructuredResult {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value @ Value::Object(_)) => StructuredResult::from_value(value),
        Ok(_) => StructuredResult::raw_text(cleaned),
        Err(e) => {
            tracing::debug!("Model output is not JSON ({e}), keeping raw text");
            StructuredResult::raw_text(cleaned)
        }
    }
}

/// Parse a `{"fields": [...]}` answer embedded anywhere in the text.
///
/// The span from the first `{` to the last `}` is decoded. Failures are
/// reported as diagnostic fields rather than errors.
pub fn extract_fields(raw: &str) -> StructuredResult {
    let span = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => {
            return StructuredResult::from_fields(vec![
                FormField::new("Raw AI Response", truncate_chars(raw, RAW_RESPONSE_PREVIEW)),
                FormField::new("Note", "AI did not return valid JSON. Showing raw response."),
            ]);
        }
    };

    match serde_json::from_str::<Value>(span) {
        Ok(value) if value.get("fields").is_some_and(Value::is_array) => {
            StructuredResult::from_value(value)
        }
        Ok(_) => StructuredResult::from_fields(vec![FormField::new(
            "Parsing Error",
            "JSON structure is invalid",
        )]),
        Err(e) => StructuredResult::from_fields(vec![
            FormField::new("JSON Parse Error", e.to_string()),
            FormField::new("Raw Response", truncate_chars(raw, PARSE_ERROR_PREVIEW)),
        ]),
    }
}

/// First `max` characters of `s`, never splitting a code point.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
