//! Ports onto the managed backend: document store, identity provider and
//! blob store. Everything above this module is vendor-agnostic; the concrete
//! implementation used by tests and local development lives in [`memory`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;

pub mod memory;

/// Names of the logical collections in the remote document store.
pub mod collections {
    pub const EVENTS: &str = "events";
    pub const USERS: &str = "users";
    pub const RSVPS: &str = "rsvps";
    pub const CHAT_MESSAGES: &str = "chatMessages";
    pub const TEAMMATE_POSTS: &str = "teammatePosts";
}

/// A raw record as delivered by the document store, before normalization.
#[derive(Debug, Clone)]
pub struct RawDoc {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RawDoc {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Equality predicate for queries and subscriptions. The reserved field name
/// `"id"` matches against the document id rather than a stored field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn matches(&self, doc: &RawDoc) -> bool {
        match self {
            Filter::Eq(field, value) => {
                if field == "id" {
                    Value::String(doc.id.clone()) == *value
                } else {
                    doc.field(field) == Some(value)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// One full push of current state for a subscribed query.
pub type Snapshot = Vec<RawDoc>;

/// A cancellable live query. Snapshots arrive through [`LiveQuery::next`];
/// a delivered `Err` is terminal for the subscription (no automatic retry,
/// the consumer decides whether to resubscribe). Dropping the handle cancels
/// the subscription.
pub struct LiveQuery {
    rx: mpsc::Receiver<Result<Snapshot, AppError>>,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl LiveQuery {
    pub fn new(rx: mpsc::Receiver<Result<Snapshot, AppError>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            cancelled: Arc::new(AtomicBool::new(false)),
            task: Some(task),
        }
    }

    /// Wait for the next snapshot. Returns `None` once the subscription has
    /// been cancelled or the producer has gone away. A snapshot already in
    /// flight when `cancel` was called is dropped, not delivered.
    pub async fn next(&mut self) -> Option<Result<Snapshot, AppError>> {
        if self.is_cancelled() {
            return None;
        }
        let item = self.rx.recv().await;
        if self.is_cancelled() {
            return None;
        }
        item
    }

    /// Cancel the subscription. Idempotent: cancelling twice has the same
    /// observable effect as cancelling once.
    pub fn cancel(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Document-oriented storage with live queries and set-style array updates.
///
/// `array_union` / `array_remove` are the only sanctioned way to touch
/// array-valued fields that have concurrent writers; read-modify-write of the
/// whole array would clobber them.
pub trait DocumentStore: Send + Sync {
    fn add<'a>(
        &'a self,
        collection: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<String, AppError>>;

    fn get<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<RawDoc>, AppError>>;

    fn get_all<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<Vec<RawDoc>, AppError>>;

    /// Create or merge a document under a caller-chosen id (profiles are
    /// keyed by the owning user's uid).
    fn set<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), AppError>>;

    /// Merge the given fields into an existing document.
    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), AppError>>;

    fn delete<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<(), AppError>>;

    /// Add `value` to an array field if not already present.
    fn array_union<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        field: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<(), AppError>>;

    /// Remove every occurrence of `value` from an array field.
    fn array_remove<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        field: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<(), AppError>>;

    /// Open a live subscription. Registration is synchronous; failures after
    /// registration are delivered through the query as a terminal `Err`.
    fn subscribe(
        &self,
        collection: &str,
        filter: Option<Filter>,
        order_by: Option<OrderBy>,
    ) -> Result<LiveQuery, AppError>;
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl AuthUser {
    /// Human-readable handle: display name, else the e-mail local part.
    pub fn handle(&self) -> String {
        if let Some(name) = &self.display_name {
            if !name.is_empty() {
                return name.clone();
            }
        }
        self.email
            .split('@')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("Anonymous")
            .to_string()
    }
}

pub trait IdentityProvider: Send + Sync {
    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthUser, AppError>>;

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthUser, AppError>>;

    fn sign_out<'a>(&'a self) -> BoxFuture<'a, Result<(), AppError>>;

    fn current_user(&self) -> Option<AuthUser>;

    /// Subscribe to "current user changed" notifications.
    fn watch(&self) -> tokio::sync::watch::Receiver<Option<AuthUser>>;
}

pub trait BlobStore: Send + Sync {
    /// Upload bytes under a path, returning a retrievable URL.
    fn upload<'a>(
        &'a self,
        path: &'a str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<String, AppError>>;

    fn delete_by_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), AppError>>;
}
