// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use campusvibe::backend::memory::MemoryBackend;
use campusvibe::backend::{AuthUser, DocumentStore, collections};
use campusvibe::{Client, Config};
use chrono::{DateTime, TimeZone, Utc};
use fake::Fake;
use fake::faker::name::en::Name;
use serde_json::{Map, Value, json};

/// Test client over a fresh in-memory backend. The raw backend stays
/// reachable for seeding and fault injection.
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub client: Client,
}

impl TestContext {
    pub fn new() -> Self {
        setup_test_env();
        let backend = Arc::new(MemoryBackend::new());
        let client = Client::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            test_config(),
        );
        TestContext { backend, client }
    }

    /// Register and sign in a test account (a valid university address).
    pub async fn sign_up(&self, email: &str) -> AuthUser {
        self.client
            .auth()
            .sign_up(email, "password123", "password123")
            .await
            .expect("sign up should succeed")
    }

    pub async fn seed_event(&self, fields: Map<String, Value>) -> String {
        self.client
            .store()
            .add(collections::EVENTS, fields)
            .await
            .expect("seeding event should succeed")
    }

    pub async fn raw_docs(&self, collection: &str) -> Vec<campusvibe::backend::RawDoc> {
        self.client
            .store()
            .get_all(collection)
            .await
            .expect("reading collection should succeed")
    }
}

pub fn test_config() -> Config {
    Config {
        project_id: "campusvibe-test".to_string(),
        api_key: "test-key".to_string(),
        storage_bucket: "campusvibe-test.appspot.com".to_string(),
        default_campus: "RMIT University".to_string(),
        metadata_timeout_secs: 5,
        upload_timeout_secs: 5,
        environment: "test".to_string(),
    }
}

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn dec(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, day, hour, 0, 0).unwrap()
}

// Raw-record builders
pub struct MockData;

impl MockData {
    pub fn event(title: &str, start: DateTime<Utc>) -> Map<String, Value> {
        let host_name: String = Name().fake();
        let value = json!({
            "title": title,
            "description": "A test event",
            "category": "Tech",
            "date": start.to_rfc3339(),
            "location": "Building 80",
            "campus": "RMIT University",
            "host": {
                "id": "host-1",
                "name": host_name,
                "university": "RMIT University"
            },
            "attendees": [],
            "maxAttendees": 50,
            "isFree": true,
            "tags": [],
            "requirements": [],
            "hasFood": false,
            "createdBy": "host-1",
            "createdAt": start.to_rfc3339(),
            "updatedAt": start.to_rfc3339(),
        });
        let Value::Object(fields) = value else {
            unreachable!()
        };
        fields
    }

    pub fn event_input(title: &str, start: DateTime<Utc>) -> campusvibe::models::EventInput {
        campusvibe::models::EventInput {
            title: title.to_string(),
            description: "A test event".to_string(),
            category: "tech".parse().unwrap(),
            start,
            end: None,
            location: "Building 80".to_string(),
            campus: "RMIT University".to_string(),
            image: None,
            max_attendees: Some(50),
            is_free: true,
            tags: vec![],
            requirements: vec![],
            has_food: false,
            is_beginner_friendly: false,
        }
    }

    pub fn message(event_id: &str, text: &str, created_at: DateTime<Utc>) -> Map<String, Value> {
        let value = json!({
            "eventId": event_id,
            "senderId": "u-someone",
            "senderName": "Someone",
            "text": text,
            "createdAt": created_at.to_rfc3339(),
        });
        let Value::Object(fields) = value else {
            unreachable!()
        };
        fields
    }

    pub fn rsvp(event_id: &str, user_id: &str, created_at: DateTime<Utc>) -> Map<String, Value> {
        let value = json!({
            "eventId": event_id,
            "userId": user_id,
            "checkedIn": false,
            "createdAt": created_at.to_rfc3339(),
        });
        let Value::Object(fields) = value else {
            unreachable!()
        };
        fields
    }
}
