//! Strict parsing of JSON answers embedded in model text.

use log::warn;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Semantic checks applied after a response deserializes.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        self.iter()
            .enumerate()
            .try_for_each(|(index, entry)| entry.validate().map_err(|e| format!("[{index}]: {e}")))
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response failed validation: {0}")]
    Invalid(String),
}

/// Removes a surrounding ```json / ``` fence and whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Slice from the first `{`/`[` to the matching last `}`/`]`, for answers
/// that wrap the JSON in prose.
fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

pub fn try_parse_structured<T>(raw: &str) -> Result<T, ParseError>
where
    T: DeserializeOwned + Validate,
{
    let cleaned = strip_code_fences(raw);
    let value: T = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(err) => match embedded_json(cleaned) {
            Some(inner) if inner.len() < cleaned.len() => serde_json::from_str(inner)?,
            _ => return Err(err.into()),
        },
    };
    value.validate().map_err(ParseError::Invalid)?;
    Ok(value)
}

/// Parses and validates `raw`, substituting `fallback()` on any failure.
pub fn parse_structured_response<T, F>(raw: &str, fallback: F) -> T
where
    T: DeserializeOwned + Validate,
    F: FnOnce() -> T,
{
    match try_parse_structured(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("Falling back after unusable model response: {err}");
            fallback()
        }
    }
}
