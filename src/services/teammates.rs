use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::backend::{DocumentStore, Filter, IdentityProvider, LiveQuery, OrderBy, collections};
use crate::error::AppError;
use crate::models::{TeammatePost, TeammatePostInput};
use crate::services::events::normalize_all;

/// Teammate-finding board for one event, newest posts first.
pub struct TeammateBoard {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    event_id: String,
    query: LiveQuery,
    posts: Vec<TeammatePost>,
}

impl TeammateBoard {
    pub(crate) fn open(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        event_id: &str,
    ) -> Result<Self, AppError> {
        let query = store.subscribe(
            collections::TEAMMATE_POSTS,
            Some(Filter::eq("eventId", event_id)),
            Some(OrderBy::desc("createdAt")),
        )?;
        Ok(Self {
            store,
            identity,
            event_id: event_id.to_string(),
            query,
            posts: Vec::new(),
        })
    }

    pub async fn poll(&mut self) -> Result<bool, AppError> {
        match self.query.next().await {
            Some(Ok(snapshot)) => {
                self.posts = normalize_all(&snapshot, TeammatePost::from_raw, "teammate post");
                Ok(true)
            }
            Some(Err(err)) => {
                log::error!(
                    "teammate-post subscription failed for {}: {}",
                    self.event_id,
                    err
                );
                Err(err)
            }
            None => Ok(false),
        }
    }

    pub fn posts(&self) -> &[TeammatePost] {
        &self.posts
    }

    pub fn cancel(&mut self) {
        self.query.cancel();
    }

    pub async fn create(&self, input: TeammatePostInput) -> Result<String, AppError> {
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;
        input.validate()?;
        let fields = input.to_fields(&self.event_id, &user.uid, &user.handle(), Utc::now());
        self.store.add(collections::TEAMMATE_POSTS, fields).await
    }

    /// Join a post's member list; a set-style update, safe under concurrent
    /// joiners.
    pub async fn join(&self, post_id: &str) -> Result<(), AppError> {
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;
        self.store
            .array_union(
                collections::TEAMMATE_POSTS,
                post_id,
                "members",
                json!(user.uid),
            )
            .await
    }
}
