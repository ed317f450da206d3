// src/normalizer/mod.rs
//! Coercion of untrusted model output into the bounded response schema.
//!
//! Nothing in here fails once a JSON object has been recovered: missing or
//! ill-typed fields fall back to fixed defaults, numbers are clamped and
//! lists are filtered and capped.

pub mod analysis;
pub mod precheck;
pub mod profile;

pub use analysis::{normalize_analysis, normalize_reasons, parse_analysis};
pub use precheck::{normalize_precheck, parse_precheck};
pub use profile::{normalize_profile, normalize_survey, parse_profile};

use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("model output was not a JSON object")]
pub struct ParseError;

/// Parses a model reply that was asked to be JSON.
///
/// Models sometimes wrap the object in prose or code fences, so when the
/// whole text is not an object the outermost `{...}` span is tried instead.
pub fn parse_model_output(content: &str) -> Result<Value, ParseError> {
    match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => find_json_block(content).ok_or(ParseError),
    }
}

fn find_json_block(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Numeric reading of a JSON value; `None` stands for "not a number".
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok().filter(|n| !n.is_nan())
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Rounds into `[0, 100]`, or returns `fallback` when the value is absent or
/// not a number.
pub fn clamp_score(value: &Value, fallback: u8) -> u8 {
    match numeric(value) {
        None => fallback,
        Some(n) if n < 0.0 => 0,
        Some(n) if n > 100.0 => 100,
        Some(n) => n.round() as u8,
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Trimmed text of a scalar, `None` for null, objects and arrays.
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    Some(text)
}

pub fn sanitize_text(value: &Value) -> String {
    scalar_text(value).unwrap_or_default()
}

/// Non-empty trimmed text, or `None`.
pub fn required_text(value: &Value) -> Option<String> {
    scalar_text(value).filter(|s| !s.is_empty())
}

/// Maps each element of a JSON array through `map`, drops the rejected ones
/// and keeps at most `cap`. Anything that is not an array yields an empty list.
pub fn sanitize_list<T, F>(value: &Value, cap: usize, mut map: F) -> Vec<T>
where
    F: FnMut(usize, &Value) -> Option<T>,
{
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| map(idx, item))
            .take(cap)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn string_list(value: &Value, cap: usize) -> Vec<String> {
    sanitize_list(value, cap, |_, item| required_text(item))
}

/// Parses a string field into an enum, falling back to its default.
pub fn enum_or_default<T>(value: &Value) -> T
where
    T: FromStr + Default,
{
    value
        .as_str()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default()
}
