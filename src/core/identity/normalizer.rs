// src/core/identity/normalizer.rs
//! Turns whatever RD Services hands back for a capture into the single
//! string that is both stored with a patient and used to look them up.
//!
//! Precedence: a plain string is used verbatim, then a truthy `template`
//! field, then a truthy `data` field. Anything else is hashed with a
//! 32-bit polynomial rolling hash and suffixed with the capture time.
//! The hashed form changes with capture time, so the same finger yields a
//! different identifier in a later session; those identifiers are
//! provisional and will not match across sessions.

use chrono::Utc;
use serde_json::Value;

use super::types::BiometricIdentifier;

pub fn normalize(payload: &Value) -> BiometricIdentifier {
    normalize_at(payload, Utc::now().timestamp_millis())
}

/// Same as [`normalize`] with the capture time given in epoch milliseconds.
pub fn normalize_at(payload: &Value, captured_at_ms: i64) -> BiometricIdentifier {
    if let Value::String(raw) = payload {
        return BiometricIdentifier::new(raw.clone());
    }

    for field in ["template", "data"] {
        if let Some(value) = payload.get(field).filter(|v| is_truthy(v)) {
            return BiometricIdentifier::new(value_to_string(value));
        }
    }

    // serde_json's default map keeps keys sorted, so this is stable per payload.
    let serialized = payload.to_string();
    BiometricIdentifier::new(format!(
        "{}{}",
        fingerprint_hash(&serialized),
        to_base36(captured_at_ms.unsigned_abs())
    ))
}

/// `hash = hash * 31 + unit` over UTF-16 code units, wrapped to `i32`,
/// rendered as the base-36 absolute value.
pub fn fingerprint_hash(data: &str) -> String {
    let hash = rolling_hash(data);
    to_base36(i64::from(hash).unsigned_abs())
}

pub fn rolling_hash(data: &str) -> i32 {
    data.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
