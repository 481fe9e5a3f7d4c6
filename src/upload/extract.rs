//! Link extraction from loosely specified JSON bodies.
//!
//! Hosts disagree on where the link lives, and some change it between API
//! versions. Adapters list [`Extractor`]s in priority order and take the
//! first hit.

use serde_json::Value;

/// One way of pulling a link out of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// Non-empty string (or number) at a JSON pointer, e.g. `/result/url`
    Pointer(&'static str),
    /// Any non-null value at a JSON pointer, stringified if not a string
    Stringified(&'static str),
}

impl Extractor {
    pub fn extract(&self, body: &Value) -> Option<String> {
        match *self {
            Extractor::Pointer(pointer) => match body.pointer(pointer)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            },
            Extractor::Stringified(pointer) => match body.pointer(pointer)? {
                Value::Null => None,
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            },
        }
    }
}

/// First extractor that yields a value.
pub fn first_match(body: &Value, extractors: &[Extractor]) -> Option<String> {
    extractors.iter().find_map(|e| e.extract(body))
}

/// Best human-readable error from a failed response body.
pub fn error_message(body: &Value) -> String {
    const CANDIDATES: &[Extractor] = &[
        Extractor::Pointer("/error"),
        Extractor::Pointer("/message"),
        Extractor::Pointer("/msg"),
        Extractor::Pointer("/error/message"),
        Extractor::Pointer("/status"),
    ];
    first_match(body, CANDIDATES).unwrap_or_else(|| body.to_string())
}
