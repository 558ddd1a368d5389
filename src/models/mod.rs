//! Typed domain entities and their normalizers. Every field read from a raw
//! remote record happens here, once, with the default policy in one place:
//! missing optional fields get documented defaults and never fail
//! normalization; only a missing identity is an error.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::backend::RawDoc;
use crate::error::AppError;

pub mod chat;
pub mod event;
pub mod rsvp;
pub mod teammate;
pub mod user;

pub use chat::ChatMessage;
pub use event::{Event, EventCategory, EventHost, EventInput};
pub use rsvp::Rsvp;
pub use teammate::{TeammatePost, TeammatePostInput};
pub use user::UserProfile;

pub(crate) fn require_id(doc: &RawDoc, kind: &str) -> Result<String, AppError> {
    if doc.id.is_empty() {
        return Err(AppError::validation(format!("{} record has no id", kind)));
    }
    Ok(doc.id.clone())
}

pub(crate) fn string_field(fields: &Map<String, Value>, name: &str, default: &str) -> String {
    match fields.get(name) {
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

pub(crate) fn opt_string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn bool_field(fields: &Map<String, Value>, name: &str, default: bool) -> bool {
    match fields.get(name) {
        Some(Value::Bool(b)) => *b,
        _ => default,
    }
}

pub(crate) fn u32_field(fields: &Map<String, Value>, name: &str, default: u32) -> u32 {
    fields
        .get(name)
        .and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(default)
}

pub(crate) fn string_list(fields: &Map<String, Value>, name: &str) -> Vec<String> {
    match fields.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a timestamp in any of the encodings the remote store produces:
/// an RFC 3339 string, epoch milliseconds, or a server-timestamp object
/// (`{"seconds": .., "nanoseconds": ..}`).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| DateTime::from_timestamp_millis(millis)),
        Value::Object(map) => {
            let seconds = map.get("seconds").and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .and_then(Value::as_u64)
                .unwrap_or(0)
                .min(u32::MAX as u64) as u32;
            DateTime::from_timestamp(seconds, nanos)
        }
        _ => None,
    }
}

/// Missing timestamps normalize to the epoch so that normalization stays a
/// pure function of its input.
pub(crate) fn timestamp_field(fields: &Map<String, Value>, name: &str) -> DateTime<Utc> {
    opt_timestamp_field(fields, name).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn opt_timestamp_field(
    fields: &Map<String, Value>,
    name: &str,
) -> Option<DateTime<Utc>> {
    fields.get(name).and_then(parse_timestamp)
}

/// Wire encoding for date-times written by this client.
pub fn timestamp_value(when: DateTime<Utc>) -> Value {
    Value::String(when.to_rfc3339())
}
