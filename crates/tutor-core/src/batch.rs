//! Parsing of generated batches.
//!
//! Exam questions and flashcards arrive as a JSON array encoded inside the
//! chat `answer` string. A batch is all-or-nothing: one bad element rejects
//! the whole payload.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Result, TutorError};

/// Matches a payload wrapped in a Markdown code fence, optionally tagged `json`.
static CODE_FENCE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$").ok());

/// Removes a surrounding Markdown code fence, if any.
fn strip_code_fence(payload: &str) -> &str {
    CODE_FENCE
        .as_ref()
        .and_then(|re| re.captures(payload))
        .and_then(|caps| caps.get(1))
        .map_or_else(|| payload.trim(), |m| m.as_str())
}

/// Parses a generated payload into a batch of `T`.
///
/// # Errors
///
/// Returns a `GenerationError` of kind `NotAnArray` if the payload is valid
/// JSON but not an array, and of kind `Malformed` if it is not valid JSON or
/// any element does not have the shape of `T`.
pub fn parse_batch<T: DeserializeOwned>(payload: &str) -> Result<Vec<T>> {
    let body = strip_code_fence(payload);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| TutorError::malformed(e.to_string()))?;

    if !value.is_array() {
        return Err(TutorError::not_an_array());
    }

    serde_json::from_value(value).map_err(|e| TutorError::malformed(e.to_string()))
}
