//! Resilient parser for structured completion text
//!
//! Completions are prompted to be pure JSON, but models routinely wrap the
//! payload in code fences or surround it with prose. `parse` tries, in order:
//! the whole text, the text inside a leading code fence, then the first
//! balanced `{...}`/`[...]` span that decodes. If nothing decodes the raw
//! text comes back as `StructuredResponse::Degraded`.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Result of parsing a completion that should have been structured data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredResponse {
    /// A decoded JSON object or array
    Structured(Value),
    /// Nothing decodable; the raw text is kept so it is never lost
    Degraded {
        #[serde(rename = "rawResponse")]
        raw_response: String,
    },
}

impl StructuredResponse {
    pub fn degraded(raw: impl Into<String>) -> Self {
        Self::Degraded {
            raw_response: raw.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Structured(v) => Some(v),
            Self::Degraded { .. } => None,
        }
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Structured(_) => None,
            Self::Degraded { raw_response } => Some(raw_response),
        }
    }
}

/// Parse completion text into structured data, degrading instead of failing
pub fn parse(raw: &str) -> StructuredResponse {
    debug!(raw_len = raw.len(), "parse: called");

    if let Some(value) = decode_container(raw) {
        debug!("parse: decoded whole text");
        return StructuredResponse::Structured(value);
    }

    if let Some(inner) = strip_code_fence(raw)
        && let Some(value) = decode_container(inner)
    {
        debug!("parse: decoded fenced block");
        return StructuredResponse::Structured(value);
    }

    if let Some(value) = first_balanced_span(raw) {
        debug!("parse: decoded embedded span");
        return StructuredResponse::Structured(value);
    }

    warn!(raw_len = raw.len(), "parse: no structured data found, degrading");
    StructuredResponse::degraded(raw)
}

/// Decode text as a JSON object or array; scalars don't count
fn decode_container(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

/// Remove a leading code fence and its label line, plus a closing fence if present
///
/// Returns `None` when the text doesn't start with a fence.
pub fn strip_code_fence(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return None;
    }

    // The label line ("```json") is dropped whole
    let body = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed.trim_start_matches('`'),
    };

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    Some(body.trim())
}

/// Find the first `{...}` or `[...]` span that decodes
///
/// Brackets inside JSON strings are ignored while matching.
fn first_balanced_span(raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = raw[search_from..].find(['{', '[']) {
        let start = search_from + offset;
        if let Some(end) = matching_close(bytes, start)
            && let Some(value) = decode_container(&raw[start..=end])
        {
            return Some(value);
        }
        search_from = start + 1;
    }
    None
}

/// Index of the bracket closing the one at `start`, if balanced
fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
