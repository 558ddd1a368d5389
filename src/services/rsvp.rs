use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join_all;
use serde_json::{Map, Value, json};

use crate::backend::{AuthUser, DocumentStore, Filter, IdentityProvider, LiveQuery, collections};
use crate::error::AppError;
use crate::models::{Event, Rsvp, timestamp_value};

/// Optimistic attendance toggling for one event.
///
/// Two state layers: the authoritative attendee list from the event's live
/// subscription, and a transient optimistic overlay set while a toggle is in
/// flight. They are merged only when read; the overlay is never persisted and
/// every snapshot supersedes it.
pub struct RsvpCoordinator {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    event_id: String,
    query: LiveQuery,
    attendees: Vec<String>,
    overlay: Option<bool>,
}

impl RsvpCoordinator {
    pub(crate) fn open(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        event_id: &str,
    ) -> Result<Self, AppError> {
        let query = store.subscribe(
            collections::EVENTS,
            Some(Filter::eq("id", event_id)),
            None,
        )?;
        Ok(Self {
            store,
            identity,
            event_id: event_id.to_string(),
            query,
            attendees: Vec::new(),
            overlay: None,
        })
    }

    /// Apply the next authoritative snapshot. Clears the optimistic overlay:
    /// the server state wins, whatever the overlay hoped for.
    pub async fn poll(&mut self) -> Result<bool, AppError> {
        match self.query.next().await {
            Some(Ok(snapshot)) => {
                match snapshot.first() {
                    Some(doc) => {
                        let event = Event::from_raw(doc)?;
                        self.apply_event(&event);
                    }
                    None => {
                        // Event was deleted out from under us.
                        self.attendees.clear();
                        self.overlay = None;
                    }
                }
                Ok(true)
            }
            Some(Err(err)) => {
                log::error!("event subscription failed for {}: {}", self.event_id, err);
                Err(err)
            }
            None => Ok(false),
        }
    }

    pub fn apply_event(&mut self, event: &Event) {
        if event.id != self.event_id {
            return;
        }
        self.attendees = event.attendees.clone();
        self.overlay = None;
    }

    pub fn cancel(&mut self) {
        self.query.cancel();
    }

    /// Attendance as the UI should render it: optimistic overlay when one is
    /// pending, authoritative state otherwise. False when signed out.
    pub fn is_attending(&self) -> bool {
        match self.identity.current_user() {
            Some(user) => self
                .overlay
                .unwrap_or_else(|| self.attendees.iter().any(|id| id == &user.uid)),
            None => false,
        }
    }

    /// Count from the authoritative snapshot only; the overlay is a UI hint,
    /// not a data source.
    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }

    /// Toggle attendance. Returns the new membership state on success.
    ///
    /// The direction is decided from the merged state (the same rule as
    /// [`is_attending`](Self::is_attending)), so toggling twice in sequence
    /// returns to the original membership even before the next snapshot
    /// arrives. Overlapping toggles cannot happen: the exclusive borrow keeps
    /// one in flight per coordinator.
    ///
    /// Two remote writes, not a transaction: the attendee-list set-update and
    /// the RSVP record. If the second fails after the first succeeded, the
    /// optimistic flag is reverted and a `PartialFailure` is reported; the
    /// attendee list is left for the next snapshot to reconcile.
    pub async fn toggle(&mut self) -> Result<bool, AppError> {
        let user = self.identity.current_user().ok_or(AppError::NotAuthenticated)?;

        let attending = self
            .overlay
            .unwrap_or_else(|| self.attendees.iter().any(|id| id == &user.uid));
        let joining = !attending;
        self.overlay = Some(joining);

        let result = if joining {
            self.join(&user).await
        } else {
            self.leave(&user).await
        };

        match result {
            Ok(()) => Ok(joining),
            Err(err) => {
                self.overlay = None;
                log::error!("RSVP toggle failed for event {}: {}", self.event_id, err);
                Err(err)
            }
        }
    }

    async fn join(&self, user: &AuthUser) -> Result<(), AppError> {
        self.store
            .array_union(
                collections::EVENTS,
                &self.event_id,
                "attendees",
                json!(user.uid),
            )
            .await?;

        let existing = self
            .matching_rsvps(&user.uid)
            .await
            .map_err(partial_after_join)?;
        // One RSVP per (event, user): the backend does not enforce it.
        if existing.is_empty() {
            self.store
                .add(collections::RSVPS, rsvp_fields(&self.event_id, user))
                .await
                .map_err(partial_after_join)?;
        }
        Ok(())
    }

    async fn leave(&self, user: &AuthUser) -> Result<(), AppError> {
        self.store
            .array_remove(
                collections::EVENTS,
                &self.event_id,
                "attendees",
                json!(user.uid),
            )
            .await?;

        let existing = self
            .matching_rsvps(&user.uid)
            .await
            .map_err(partial_after_leave)?;
        let deletes = existing
            .iter()
            .map(|rsvp| self.store.delete(collections::RSVPS, &rsvp.id));
        try_join_all(deletes).await.map_err(partial_after_leave)?;
        Ok(())
    }

    async fn matching_rsvps(&self, uid: &str) -> Result<Vec<Rsvp>, AppError> {
        let docs = self.store.get_all(collections::RSVPS).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| Rsvp::from_raw(doc).ok())
            .filter(|rsvp| rsvp.is_for(&self.event_id, uid))
            .collect())
    }
}

fn partial_after_join(err: AppError) -> AppError {
    AppError::partial_failure("attendee-list update", format!("RSVP record: {}", err))
}

fn partial_after_leave(err: AppError) -> AppError {
    AppError::partial_failure("attendee-list removal", format!("RSVP record: {}", err))
}

fn rsvp_fields(event_id: &str, user: &AuthUser) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("eventId".into(), json!(event_id));
    fields.insert("userId".into(), json!(user.uid));
    fields.insert("userName".into(), json!(user.handle()));
    fields.insert("checkedIn".into(), json!(false));
    fields.insert("createdAt".into(), timestamp_value(Utc::now()));
    fields
}
