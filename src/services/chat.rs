use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::backend::{DocumentStore, Filter, IdentityProvider, LiveQuery, OrderBy, collections};
use crate::error::AppError;
use crate::models::{ChatMessage, timestamp_value};
use crate::services::events::normalize_all;

/// Live chat for one event. Messages are ordered by the subscription on
/// `createdAt`, oldest first.
pub struct ChatRoom {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    event_id: String,
    query: LiveQuery,
    messages: Vec<ChatMessage>,
}

impl ChatRoom {
    pub(crate) fn open(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        event_id: &str,
    ) -> Result<Self, AppError> {
        let query = store.subscribe(
            collections::CHAT_MESSAGES,
            Some(Filter::eq("eventId", event_id)),
            Some(OrderBy::asc("createdAt")),
        )?;
        Ok(Self {
            store,
            identity,
            event_id: event_id.to_string(),
            query,
            messages: Vec::new(),
        })
    }

    pub async fn poll(&mut self) -> Result<bool, AppError> {
        match self.query.next().await {
            Some(Ok(snapshot)) => {
                self.messages = normalize_all(&snapshot, ChatMessage::from_raw, "chat message");
                Ok(true)
            }
            Some(Err(err)) => {
                log::error!("chat subscription failed for {}: {}", self.event_id, err);
                Err(err)
            }
            None => Ok(false),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn cancel(&mut self) {
        self.query.cancel();
    }

    /// Send a message. Whitespace-only input is ignored and returns `None`;
    /// otherwise the new message id is returned.
    pub async fn send(&self, text: &str) -> Result<Option<String>, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;

        let mut fields = Map::new();
        fields.insert("eventId".into(), json!(self.event_id));
        fields.insert("senderId".into(), json!(user.uid));
        fields.insert("senderName".into(), json!(user.handle()));
        fields.insert("text".into(), Value::String(text.to_string()));
        fields.insert("createdAt".into(), timestamp_value(Utc::now()));

        let id = self.store.add(collections::CHAT_MESSAGES, fields).await?;
        Ok(Some(id))
    }
}
