use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;

use crate::backend::{
    DocumentStore, IdentityProvider, LiveQuery, OrderBy, RawDoc, Snapshot, collections,
};
use crate::error::AppError;
use crate::models::{Event, EventHost, EventInput, UserProfile, timestamp_value};
use crate::services::auth::university_from_email;
use crate::views::{self, EventFilters, MyEvents};

/// Live view of the events collection plus the create/update/delete surface.
///
/// Owns exactly one subscription; opening a feed where another is active for
/// the same consumer means cancelling the old one first (dropping the feed
/// does that).
pub struct EventFeed {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    query: LiveQuery,
    latest: Vec<Event>,
}

impl EventFeed {
    pub(crate) fn open(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppError> {
        let query = store.subscribe(collections::EVENTS, None, Some(OrderBy::desc("createdAt")))?;
        Ok(Self {
            store,
            identity,
            query,
            latest: Vec::new(),
        })
    }

    /// Wait for and apply the next snapshot. `Ok(true)` means `latest` was
    /// replaced; `Ok(false)` means the subscription has ended. An `Err` is
    /// terminal for this subscription.
    pub async fn poll(&mut self) -> Result<bool, AppError> {
        match self.query.next().await {
            Some(Ok(snapshot)) => {
                self.latest = normalize_events(&snapshot);
                Ok(true)
            }
            Some(Err(err)) => {
                log::error!("events subscription failed: {}", err);
                Err(err)
            }
            None => Ok(false),
        }
    }

    pub fn cancel(&mut self) {
        self.query.cancel();
    }

    /// The latest authoritative snapshot, normalized.
    pub fn latest(&self) -> &[Event] {
        &self.latest
    }

    /// Filtered and sorted projection of the latest snapshot; attending
    /// events come first for a signed-in user.
    pub fn filtered(&self, filters: &EventFilters, today: NaiveDate) -> Vec<Event> {
        let user = self.identity.current_user();
        let mut events = views::filter_events(&self.latest, filters, today);
        views::sort_events(&mut events, user.as_ref().map(|u| u.uid.as_str()));
        events
    }

    /// The home-page split: (events the user attends, everything else).
    pub fn front_page(
        &self,
        filters: &EventFilters,
        today: NaiveDate,
    ) -> (Vec<Event>, Vec<Event>) {
        let user = self.identity.current_user();
        let events = self.filtered(filters, today);
        views::partition_attending(&events, user.as_ref().map(|u| u.uid.as_str()))
    }

    pub fn my_events(&self) -> Result<MyEvents, AppError> {
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;
        Ok(views::my_events(&self.latest, &user.uid, Utc::now()))
    }

    pub async fn get(&self, event_id: &str) -> Result<Event, AppError> {
        let doc = self
            .store
            .get(collections::EVENTS, event_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("event {}", event_id)))?;
        Event::from_raw(&doc)
    }

    pub async fn create(&self, input: EventInput) -> Result<String, AppError> {
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;
        input.validate()?;

        let host = self.host_identity(&user.uid, &user.email).await;
        let now = Utc::now();
        let mut fields = input.to_fields(&host, &user.uid, now);
        fields.insert("attendees".into(), json!([]));
        fields.insert("createdAt".into(), timestamp_value(now));

        self.store.add(collections::EVENTS, fields).await
    }

    pub async fn update(&self, event_id: &str, input: EventInput) -> Result<(), AppError> {
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;
        input.validate()?;

        let existing = self.get(event_id).await?;
        if !existing.is_hosted_by(&user.uid) {
            return Err(AppError::PermissionDenied(
                "only the host can edit an event".to_string(),
            ));
        }

        let mut fields = input.to_fields(&existing.host, &existing.created_by, Utc::now());
        // Attendance and creation metadata are not editable through updates.
        fields.remove("attendees");
        fields.remove("createdAt");
        self.store
            .update(collections::EVENTS, event_id, fields)
            .await
    }

    pub async fn remove(&self, event_id: &str) -> Result<(), AppError> {
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;
        let existing = self.get(event_id).await?;
        if !existing.is_hosted_by(&user.uid) {
            return Err(AppError::PermissionDenied(
                "only the host can delete an event".to_string(),
            ));
        }
        self.store.delete(collections::EVENTS, event_id).await
    }

    /// Denormalized host block for new events: profile name/avatar when the
    /// profile loads, otherwise the auth handle.
    async fn host_identity(&self, uid: &str, email: &str) -> EventHost {
        let profile = match self.store.get(collections::USERS, uid).await {
            Ok(Some(doc)) => UserProfile::from_raw(&doc).ok(),
            Ok(None) => None,
            Err(err) => {
                log::warn!("could not load profile for host {}: {}", uid, err);
                None
            }
        };

        let fallback = || {
            email
                .split('@')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or("Anonymous")
                .to_string()
        };

        EventHost {
            id: uid.to_string(),
            name: profile
                .as_ref()
                .filter(|p| !p.name.is_empty())
                .map(|p| p.name.clone())
                .unwrap_or_else(fallback),
            avatar: profile.and_then(|p| p.avatar),
            university: university_from_email(email),
        }
    }
}

/// Normalize a snapshot, skipping records that fail (only possible for a
/// missing id).
pub(crate) fn normalize_events(snapshot: &Snapshot) -> Vec<Event> {
    normalize_all(snapshot, Event::from_raw, "event")
}

pub(crate) fn normalize_all<T>(
    snapshot: &Snapshot,
    normalize: impl Fn(&RawDoc) -> Result<T, AppError>,
    kind: &str,
) -> Vec<T> {
    snapshot
        .iter()
        .filter_map(|doc| match normalize(doc) {
            Ok(entity) => Some(entity),
            Err(err) => {
                log::warn!("skipping malformed {} record: {}", kind, err);
                None
            }
        })
        .collect()
}
