//! Turns the model's text reply into an [`Extraction`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::Extraction;

/// Matches a reply wrapped in a markdown code fence, capturing the body.
const CODE_FENCE_PATTERN: &str = r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$";

/// Parses a reply that should be a JSON array of rows, `{"results": [...]}`,
/// `{"teams": [...]}` or `{"error": "..."}`.
pub fn parse_model_text(text: &str) -> Extraction {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Extraction::Failed("model returned an empty reply".to_string());
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return Extraction::Failed(format!("model reply is not JSON: {}", e)),
    };

    match value {
        Value::Array(rows) => Extraction::Records(rows),
        Value::Object(mut map) => {
            if let Some(reason) = map.remove("error").and_then(error_reason) {
                return Extraction::Failed(reason);
            }
            match map.remove("results").or_else(|| map.remove("teams")) {
                Some(Value::Array(rows)) => Extraction::Records(rows),
                _ => Extraction::Failed("model reply has no results array".to_string()),
            }
        }
        other => Extraction::Failed(format!("unexpected model reply: {}", other)),
    }
}

/// A null or blank `error` field does not count as a failure.
fn error_reason(error: Value) -> Option<String> {
    match error {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn code_fence_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CODE_FENCE_PATTERN).ok()).as_ref()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(fence) = code_fence_regex() else {
        return text.trim();
    };
    fence
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| text.trim())
}
