//! In-memory implementation of the three backend ports, used by tests and
//! local development. Mutations fan out full snapshots to every live
//! subscription on the touched collection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::DateTime;
use futures::future::BoxFuture;
use rand::Rng;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use crate::backend::{
    AuthUser, BlobStore, DocumentStore, Filter, IdentityProvider, LiveQuery, OrderBy, RawDoc,
    Snapshot,
};
use crate::error::AppError;

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password_hash: String,
    display_name: Option<String>,
}

type Collections = Arc<RwLock<HashMap<String, Vec<RawDoc>>>>;

pub struct MemoryBackend {
    collections: Collections,
    notifiers: RwLock<HashMap<String, broadcast::Sender<()>>>,
    failing: RwLock<HashSet<String>>,
    accounts: RwLock<HashMap<String, Account>>,
    auth_tx: watch::Sender<Option<AuthUser>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    bucket: String,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (auth_tx, _) = watch::channel(None);
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            notifiers: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            accounts: RwLock::new(HashMap::new()),
            auth_tx,
            blobs: RwLock::new(HashMap::new()),
            bucket: "campusvibe-dev".to_string(),
        }
    }

    /// Make every write to `collection` fail with a transport error, for
    /// exercising partial-failure paths in tests.
    pub fn fail_writes(&self, collection: &str) {
        self.failing.write().unwrap().insert(collection.to_string());
    }

    pub fn restore_writes(&self, collection: &str) {
        self.failing.write().unwrap().remove(collection);
    }

    fn check_writable(&self, collection: &str) -> Result<(), AppError> {
        if self.failing.read().unwrap().contains(collection) {
            return Err(AppError::transport(format!(
                "write to '{}' rejected",
                collection
            )));
        }
        Ok(())
    }

    fn notifier(&self, collection: &str) -> broadcast::Sender<()> {
        let mut notifiers = self.notifiers.write().unwrap();
        notifiers
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }

    fn notify(&self, collection: &str) {
        if let Some(tx) = self.notifiers.read().unwrap().get(collection) {
            // No receivers is fine; nobody is subscribed yet.
            let _ = tx.send(());
        }
    }

    fn set_current_user(&self, user: Option<AuthUser>) {
        // send() drops the value when no receiver exists; send_replace always
        // stores it, so current_user() works without any live watcher.
        self.auth_tx.send_replace(user);
    }
}

fn read_snapshot(
    collections: &Collections,
    collection: &str,
    filter: &Option<Filter>,
    order_by: &Option<OrderBy>,
) -> Snapshot {
    let guard = collections.read().unwrap();
    let mut docs: Vec<RawDoc> = guard
        .get(collection)
        .map(|docs| {
            docs.iter()
                .filter(|doc| filter.as_ref().is_none_or(|f| f.matches(doc)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    if let Some(order) = order_by {
        docs.sort_by(|a, b| {
            let ordering = compare_values(a.field(&order.field), b.field(&order.field));
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
    docs
}

/// Field comparison for `order_by`: numbers numerically, strings as RFC 3339
/// timestamps when both parse, otherwise lexicographically. Missing fields
/// sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        _ => Ordering::Equal,
    }
}

impl DocumentStore for MemoryBackend {
    fn add<'a>(
        &'a self,
        collection: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<String, AppError>> {
        Box::pin(async move {
            self.check_writable(collection)?;
            let id = Uuid::new_v4().to_string();
            self.collections
                .write()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push(RawDoc::new(id.clone(), fields));
            self.notify(collection);
            Ok(id)
        })
    }

    fn get<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<RawDoc>, AppError>> {
        Box::pin(async move {
            let guard = self.collections.read().unwrap();
            Ok(guard
                .get(collection)
                .and_then(|docs| docs.iter().find(|doc| doc.id == id))
                .cloned())
        })
    }

    fn get_all<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<Vec<RawDoc>, AppError>> {
        Box::pin(async move {
            let guard = self.collections.read().unwrap();
            Ok(guard.get(collection).cloned().unwrap_or_default())
        })
    }

    fn set<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.check_writable(collection)?;
            {
                let mut guard = self.collections.write().unwrap();
                let docs = guard.entry(collection.to_string()).or_default();
                match docs.iter_mut().find(|doc| doc.id == id) {
                    Some(doc) => {
                        for (key, value) in fields {
                            doc.fields.insert(key, value);
                        }
                    }
                    None => docs.push(RawDoc::new(id.to_string(), fields)),
                }
            }
            self.notify(collection);
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.check_writable(collection)?;
            {
                let mut guard = self.collections.write().unwrap();
                let doc = guard
                    .get_mut(collection)
                    .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
                    .ok_or_else(|| {
                        AppError::not_found(format!("{}/{} does not exist", collection, id))
                    })?;
                for (key, value) in fields {
                    doc.fields.insert(key, value);
                }
            }
            self.notify(collection);
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.check_writable(collection)?;
            {
                let mut guard = self.collections.write().unwrap();
                if let Some(docs) = guard.get_mut(collection) {
                    docs.retain(|doc| doc.id != id);
                }
            }
            self.notify(collection);
            Ok(())
        })
    }

    fn array_union<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        field: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.check_writable(collection)?;
            {
                let mut guard = self.collections.write().unwrap();
                let doc = guard
                    .get_mut(collection)
                    .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
                    .ok_or_else(|| {
                        AppError::not_found(format!("{}/{} does not exist", collection, id))
                    })?;
                let entry = doc
                    .fields
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match entry {
                    Value::Array(items) => {
                        if !items.contains(&value) {
                            items.push(value);
                        }
                    }
                    other => {
                        return Err(AppError::transport(format!(
                            "field '{}' is not an array (found {})",
                            field, other
                        )));
                    }
                }
            }
            self.notify(collection);
            Ok(())
        })
    }

    fn array_remove<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        field: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.check_writable(collection)?;
            {
                let mut guard = self.collections.write().unwrap();
                let doc = guard
                    .get_mut(collection)
                    .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
                    .ok_or_else(|| {
                        AppError::not_found(format!("{}/{} does not exist", collection, id))
                    })?;
                if let Some(Value::Array(items)) = doc.fields.get_mut(field) {
                    items.retain(|item| item != &value);
                }
            }
            self.notify(collection);
            Ok(())
        })
    }

    fn subscribe(
        &self,
        collection: &str,
        filter: Option<Filter>,
        order_by: Option<OrderBy>,
    ) -> Result<LiveQuery, AppError> {
        let (tx, rx) = mpsc::channel(16);
        let mut pings = self.notifier(collection).subscribe();
        let collections = self.collections.clone();
        let collection = collection.to_string();

        let task = tokio::spawn(async move {
            let snapshot = read_snapshot(&collections, &collection, &filter, &order_by);
            if tx.send(Ok(snapshot)).await.is_err() {
                return;
            }
            loop {
                match pings.recv().await {
                    // On lag we still re-read the latest state, so skipped
                    // pings lose nothing.
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let snapshot = read_snapshot(&collections, &collection, &filter, &order_by);
                        if tx.send(Ok(snapshot)).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        Ok(LiveQuery::new(rx, task))
    }
}

impl IdentityProvider for MemoryBackend {
    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthUser, AppError>> {
        Box::pin(async move {
            let key = email.to_lowercase();
            let user = {
                let mut accounts = self.accounts.write().unwrap();
                if accounts.contains_key(&key) {
                    return Err(AppError::validation("email already in use"));
                }
                let password_hash = hash(password, DEFAULT_COST)
                    .map_err(|e| AppError::transport(e.to_string()))?;
                let account = Account {
                    uid: Uuid::new_v4().to_string(),
                    password_hash,
                    display_name: None,
                };
                let user = AuthUser {
                    uid: account.uid.clone(),
                    email: email.to_string(),
                    display_name: None,
                };
                accounts.insert(key, account);
                user
            };
            self.set_current_user(Some(user.clone()));
            Ok(user)
        })
    }

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthUser, AppError>> {
        Box::pin(async move {
            let key = email.to_lowercase();
            let user = {
                let accounts = self.accounts.read().unwrap();
                let account = accounts.get(&key).ok_or_else(|| {
                    AppError::PermissionDenied("invalid email or password".to_string())
                })?;
                let ok = verify(password, &account.password_hash)
                    .map_err(|e| AppError::transport(e.to_string()))?;
                if !ok {
                    return Err(AppError::PermissionDenied(
                        "invalid email or password".to_string(),
                    ));
                }
                AuthUser {
                    uid: account.uid.clone(),
                    email: email.to_string(),
                    display_name: account.display_name.clone(),
                }
            };
            self.set_current_user(Some(user.clone()));
            Ok(user)
        })
    }

    fn sign_out<'a>(&'a self) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.set_current_user(None);
            Ok(())
        })
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.auth_tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth_tx.subscribe()
    }
}

impl BlobStore for MemoryBackend {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<String, AppError>> {
        Box::pin(async move {
            let version: u32 = rand::rng().random();
            let url = format!("mem://{}/{}?alt=media&v={:08x}", self.bucket, path, version);
            self.blobs.write().unwrap().insert(url.clone(), bytes);
            Ok(url)
        })
    }

    fn delete_by_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match self.blobs.write().unwrap().remove(url) {
                Some(_) => Ok(()),
                None => Err(AppError::not_found(format!("no blob at {}", url))),
            }
        })
    }
}
