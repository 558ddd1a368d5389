use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::backend::RawDoc;
use crate::error::AppError;
use crate::models::{
    bool_field, opt_string_field, opt_timestamp_field, require_id, string_field, string_list,
    timestamp_field, timestamp_value, u32_field,
};

pub const DEFAULT_MAX_ATTENDEES: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub location: String,
    pub campus: String,
    pub image: Option<String>,
    pub host: EventHost,
    /// Unique attendee user ids; deduplicated during normalization.
    pub attendees: Vec<String>,
    /// Soft cap, not enforced atomically by this layer.
    pub max_attendees: u32,
    pub is_free: bool,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub has_food: bool,
    pub is_beginner_friendly: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHost {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub university: String,
}

impl EventHost {
    /// Stand-in identity for records whose host field is missing or malformed.
    pub fn placeholder() -> Self {
        Self {
            id: "unknown".to_string(),
            name: "Unknown Host".to_string(),
            avatar: None,
            university: "Unknown University".to_string(),
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(fields)) => Self {
                id: string_field(fields, "id", "unknown"),
                name: string_field(fields, "name", "Unknown Host"),
                avatar: opt_string_field(fields, "avatar"),
                university: string_field(fields, "university", "Unknown University"),
            },
            _ => Self::placeholder(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventCategory {
    Hackathon,
    Tech,
    Gaming,
    Food,
    Sports,
    Cultural,
    Career,
    Wellness,
    Volunteering,
    Clubs,
    #[default]
    General,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Hackathon => write!(f, "Hackathon"),
            EventCategory::Tech => write!(f, "Tech"),
            EventCategory::Gaming => write!(f, "Gaming"),
            EventCategory::Food => write!(f, "Food"),
            EventCategory::Sports => write!(f, "Sports"),
            EventCategory::Cultural => write!(f, "Cultural"),
            EventCategory::Career => write!(f, "Career"),
            EventCategory::Wellness => write!(f, "Wellness"),
            EventCategory::Volunteering => write!(f, "Volunteering"),
            EventCategory::Clubs => write!(f, "Clubs"),
            EventCategory::General => write!(f, "General"),
        }
    }
}

impl std::str::FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hackathon" => Ok(EventCategory::Hackathon),
            "tech" => Ok(EventCategory::Tech),
            "gaming" => Ok(EventCategory::Gaming),
            "food" => Ok(EventCategory::Food),
            "sports" => Ok(EventCategory::Sports),
            "cultural" => Ok(EventCategory::Cultural),
            "career" => Ok(EventCategory::Career),
            "wellness" => Ok(EventCategory::Wellness),
            "volunteering" => Ok(EventCategory::Volunteering),
            "clubs" => Ok(EventCategory::Clubs),
            "general" => Ok(EventCategory::General),
            _ => Err(format!("Invalid event category: {}", s)),
        }
    }
}

impl Event {
    /// Normalize one raw record. Missing optional fields fall back to
    /// defaults; only a missing id is an error.
    pub fn from_raw(doc: &RawDoc) -> Result<Self, AppError> {
        let id = require_id(doc, "event")?;
        let fields = &doc.fields;

        let category = string_field(fields, "category", "general")
            .parse()
            .unwrap_or_default();

        let mut attendees = string_list(fields, "attendees");
        dedup_preserving_order(&mut attendees);

        Ok(Event {
            id,
            title: string_field(fields, "title", "Untitled Event"),
            description: string_field(fields, "description", ""),
            category,
            start: timestamp_field(fields, "date"),
            end: opt_timestamp_field(fields, "endDate"),
            location: string_field(fields, "location", "TBA"),
            campus: string_field(fields, "campus", "main"),
            image: opt_string_field(fields, "image"),
            host: EventHost::from_value(fields.get("host")),
            attendees,
            max_attendees: u32_field(fields, "maxAttendees", DEFAULT_MAX_ATTENDEES),
            is_free: bool_field(fields, "isFree", true),
            tags: string_list(fields, "tags"),
            requirements: string_list(fields, "requirements"),
            has_food: bool_field(fields, "hasFood", false),
            is_beginner_friendly: bool_field(fields, "isBeginnerFriendly", false),
            created_by: string_field(fields, "createdBy", "unknown"),
            created_at: timestamp_field(fields, "createdAt"),
            updated_at: timestamp_field(fields, "updatedAt"),
        })
    }

    pub fn is_attended_by(&self, user_id: &str) -> bool {
        self.attendees.iter().any(|id| id == user_id)
    }

    pub fn is_hosted_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Fields supplied when creating or updating an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub location: String,
    pub campus: String,
    pub image: Option<String>,
    pub max_attendees: Option<u32>,
    pub is_free: bool,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub has_food: bool,
    pub is_beginner_friendly: bool,
}

impl EventInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("event title is required"));
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(AppError::validation("event end must not precede its start"));
            }
        }
        if self.max_attendees == Some(0) {
            return Err(AppError::validation("capacity must be at least 1"));
        }
        Ok(())
    }

    pub(crate) fn to_fields(
        &self,
        host: &EventHost,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), json!(self.title.trim()));
        fields.insert("description".into(), json!(self.description));
        fields.insert("category".into(), json!(self.category));
        fields.insert("date".into(), timestamp_value(self.start));
        if let Some(end) = self.end {
            fields.insert("endDate".into(), timestamp_value(end));
        }
        fields.insert("location".into(), json!(self.location));
        fields.insert("campus".into(), json!(self.campus));
        if let Some(image) = &self.image {
            fields.insert("image".into(), json!(image));
        }
        fields.insert("host".into(), json!(host));
        fields.insert(
            "maxAttendees".into(),
            json!(self.max_attendees.unwrap_or(DEFAULT_MAX_ATTENDEES)),
        );
        fields.insert("isFree".into(), json!(self.is_free));
        fields.insert("tags".into(), json!(self.tags));
        fields.insert("requirements".into(), json!(self.requirements));
        fields.insert("hasFood".into(), json!(self.has_food));
        fields.insert("isBeginnerFriendly".into(), json!(self.is_beginner_friendly));
        fields.insert("createdBy".into(), json!(created_by));
        fields.insert("updatedAt".into(), timestamp_value(now));
        fields
    }
}
