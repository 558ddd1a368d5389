use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::RawDoc;
use crate::error::AppError;
use crate::models::{require_id, string_field, timestamp_field};

/// A chat message in an event room. Immutable once created; ordering comes
/// from the subscription, keyed on `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub event_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn from_raw(doc: &RawDoc) -> Result<Self, AppError> {
        let id = require_id(doc, "chat message")?;
        let fields = &doc.fields;

        // Legacy records wrote the body under "content".
        let text = match fields.get("text") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => string_field(fields, "content", ""),
        };

        Ok(ChatMessage {
            id,
            event_id: string_field(fields, "eventId", ""),
            sender_id: string_field(fields, "senderId", "unknown"),
            sender_name: string_field(fields, "senderName", "Anonymous"),
            text,
            created_at: timestamp_field(fields, "createdAt"),
        })
    }
}
