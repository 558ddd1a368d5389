use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::backend::RawDoc;
use crate::error::AppError;
use crate::models::{require_id, string_field, string_list, timestamp_field, timestamp_value};

/// A "looking for teammates" post attached to a hackathon-style event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeammatePost {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub skills_needed: Vec<String>,
    pub members: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TeammatePost {
    pub fn from_raw(doc: &RawDoc) -> Result<Self, AppError> {
        let id = require_id(doc, "teammate post")?;
        let fields = &doc.fields;

        // Older posts stored skills under "skills".
        let skills_needed = match fields.get("skillsNeeded") {
            Some(Value::Array(_)) => string_list(fields, "skillsNeeded"),
            _ => string_list(fields, "skills"),
        };

        Ok(TeammatePost {
            id,
            event_id: string_field(fields, "eventId", ""),
            title: string_field(fields, "title", "Untitled Post"),
            description: string_field(fields, "description", ""),
            skills_needed,
            members: string_list(fields, "members"),
            created_by: string_field(fields, "authorId", "unknown"),
            created_at: timestamp_field(fields, "createdAt"),
        })
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|id| id == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeammatePostInput {
    pub title: String,
    pub description: String,
    pub skills_needed: Vec<String>,
}

impl TeammatePostInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("post title is required"));
        }
        Ok(())
    }

    pub(crate) fn to_fields(
        &self,
        event_id: &str,
        author_id: &str,
        author_name: &str,
        now: DateTime<Utc>,
    ) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("eventId".into(), json!(event_id));
        fields.insert("title".into(), json!(self.title.trim()));
        fields.insert("description".into(), json!(self.description));
        fields.insert("skillsNeeded".into(), json!(self.skills_needed));
        fields.insert("members".into(), json!([author_id]));
        fields.insert("authorId".into(), json!(author_id));
        fields.insert("authorName".into(), json!(author_name));
        fields.insert("createdAt".into(), timestamp_value(now));
        fields
    }
}
