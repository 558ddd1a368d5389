use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::RawDoc;
use crate::error::AppError;
use crate::models::{bool_field, require_id, string_field, timestamp_field};

/// One RSVP per (event, user) pair. The backend does not enforce this
/// structurally; the mutation coordinator does, client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub checked_in: bool,
}

impl Rsvp {
    pub fn from_raw(doc: &RawDoc) -> Result<Self, AppError> {
        let id = require_id(doc, "rsvp")?;
        let fields = &doc.fields;
        Ok(Rsvp {
            id,
            event_id: string_field(fields, "eventId", ""),
            user_id: string_field(fields, "userId", ""),
            created_at: timestamp_field(fields, "createdAt"),
            checked_in: bool_field(fields, "checkedIn", false),
        })
    }

    pub fn is_for(&self, event_id: &str, user_id: &str) -> bool {
        self.event_id == event_id && self.user_id == user_id
    }
}
