pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod views;

use std::sync::Arc;

use backend::{BlobStore, DocumentStore, IdentityProvider, memory::MemoryBackend};

pub use config::Config;
pub use error::AppError;
pub use services::{
    AuthService, ChatRoom, EventFeed, ProfileService, RsvpCoordinator, TeammateBoard,
};

/// Explicit context object holding the three backend ports. Every service is
/// constructed from one of these, so independent client instances can coexist
/// (there is no module-level backend state anywhere in the crate).
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
    config: Config,
}

impl Client {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
        config: Config,
    ) -> Self {
        Self {
            store,
            identity,
            blobs,
            config,
        }
    }

    /// A client backed entirely by [`MemoryBackend`], for tests and local
    /// development.
    pub fn in_memory(config: Config) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        Self::new(backend.clone(), backend.clone(), backend, config)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.identity.clone(), self.store.clone(), self.config.clone())
    }

    /// Live feed over the events collection.
    pub fn events(&self) -> Result<EventFeed, AppError> {
        EventFeed::open(self.store.clone(), self.identity.clone())
    }

    /// Attendance coordinator for one event.
    pub fn rsvp(&self, event_id: &str) -> Result<RsvpCoordinator, AppError> {
        RsvpCoordinator::open(self.store.clone(), self.identity.clone(), event_id)
    }

    /// Chat room for one event.
    pub fn chat(&self, event_id: &str) -> Result<ChatRoom, AppError> {
        ChatRoom::open(self.store.clone(), self.identity.clone(), event_id)
    }

    /// Teammate-finding board for one event.
    pub fn teammates(&self, event_id: &str) -> Result<TeammateBoard, AppError> {
        TeammateBoard::open(self.store.clone(), self.identity.clone(), event_id)
    }

    pub fn profile(&self) -> ProfileService {
        ProfileService::new(
            self.store.clone(),
            self.identity.clone(),
            self.blobs.clone(),
            self.config.clone(),
        )
    }
}
