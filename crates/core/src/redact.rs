//! Recursive redaction of sensitive keys in JSON values before logging.
//!
//! Request and response bodies pass through [`redact_json`] before they are
//! attached to a log line, so token and password material never reaches the
//! log backend even at debug level.

use serde_json::Value;

/// Replacement written over any redacted value.
pub const REDACTED: &str = "***REDACTED***";

/// Keys whose values are overwritten, compared case-insensitively.
const REDACTED_KEYS: &[&str] = &[
    "password",
    "password_hash",
    "refresh",
    "refresh_token",
    "access",
    "access_token",
    "token",
    "jwt",
    "authorization",
];

/// Redact a raw JSON byte payload for logging.
///
/// Non-JSON input is returned unchanged -- there is nothing structured to
/// walk, and opaque bodies are clipped by the caller anyway.
pub fn redact_json(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    let Ok(mut value) = serde_json::from_slice::<Value>(body) else {
        return String::from_utf8_lossy(body).into_owned();
    };
    redact_walk(&mut value);
    value.to_string()
}

/// Recursively overwrite values of sensitive keys in place.
pub fn redact_walk(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_redacted_key(key) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact_walk(val);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_walk(item);
            }
        }
        _ => {}
    }
}

/// Clip a string for logging, appending a marker when truncated.
pub fn clip(s: &str, max: usize) -> String {
    if max == 0 || s.len() <= max {
        return s.to_string();
    }
    // Cut on a char boundary at or below `max`.
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &s[..end])
}

fn is_redacted_key(key: &str) -> bool {
    REDACTED_KEYS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(key))
}
