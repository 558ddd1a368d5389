use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::backend::RawDoc;
use crate::error::AppError;
use crate::models::{
    opt_string_field, require_id, string_field, string_list, timestamp_field, timestamp_value,
    u32_field,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub campus: String,
    pub avatar: Option<String>,
    pub interests: Vec<String>,
    pub vibe_points: u32,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_raw(doc: &RawDoc) -> Result<Self, AppError> {
        let id = require_id(doc, "user profile")?;
        let fields = &doc.fields;
        Ok(UserProfile {
            id,
            name: string_field(fields, "name", ""),
            email: string_field(fields, "email", ""),
            campus: string_field(fields, "campus", ""),
            avatar: opt_string_field(fields, "avatar"),
            interests: string_list(fields, "interests"),
            vibe_points: u32_field(fields, "vibePoints", 0),
            created_at: timestamp_field(fields, "createdAt"),
        })
    }

    pub(crate) fn to_fields(&self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".into(), json!(self.name));
        fields.insert("email".into(), json!(self.email));
        fields.insert("campus".into(), json!(self.campus));
        if let Some(avatar) = &self.avatar {
            fields.insert("avatar".into(), json!(avatar));
        }
        fields.insert("interests".into(), json!(self.interests));
        fields.insert("vibePoints".into(), json!(self.vibe_points));
        fields.insert("createdAt".into(), timestamp_value(self.created_at));
        fields.insert("updatedAt".into(), timestamp_value(now));
        fields
    }
}
