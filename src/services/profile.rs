use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::backend::{AuthUser, BlobStore, DocumentStore, IdentityProvider, collections};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{UserProfile, timestamp_value};

const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;
const ALLOWED_AVATAR_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Partial profile update; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub campus: Option<String>,
    pub avatar: Option<String>,
}

/// Profile reads and writes for the signed-in user. The backend provides no
/// deadline of its own, so every metadata write runs under the configured
/// 15s timeout and every binary upload under the 30s one.
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
    config: Config,
}

impl ProfileService {
    pub(crate) fn new(
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

    fn require_user(&self) -> Result<AuthUser, AppError> {
        self.identity.current_user().ok_or(AppError::NotAuthenticated)
    }

    async fn with_metadata_deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        let secs = self.config.metadata_timeout_secs;
        tokio::time::timeout(Duration::from_secs(secs), fut)
            .await
            .map_err(|_| AppError::Timeout(secs))?
    }

    /// Load the signed-in user's profile, creating the default one on first
    /// use.
    pub async fn load_or_create(&self) -> Result<UserProfile, AppError> {
        let user = self.require_user()?;

        if let Some(doc) = self
            .with_metadata_deadline(self.store.get(collections::USERS, &user.uid))
            .await?
        {
            return UserProfile::from_raw(&doc);
        }

        log::debug!("no profile for {}, creating default", user.uid);
        let profile = UserProfile {
            id: user.uid.clone(),
            name: user.handle(),
            email: user.email.clone(),
            campus: self.config.default_campus.clone(),
            avatar: None,
            interests: Vec::new(),
            vibe_points: 0,
            created_at: Utc::now(),
        };
        self.with_metadata_deadline(self.store.set(
            collections::USERS,
            &user.uid,
            profile.to_fields(Utc::now()),
        ))
        .await?;
        Ok(profile)
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), AppError> {
        let user = self.require_user()?;

        let mut fields = Map::new();
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("name cannot be empty"));
            }
            fields.insert("name".into(), json!(name.trim()));
        }
        if let Some(campus) = update.campus {
            fields.insert("campus".into(), json!(campus));
        }
        if let Some(avatar) = update.avatar {
            fields.insert("avatar".into(), json!(avatar));
        }
        if fields.is_empty() {
            return Ok(());
        }
        fields.insert("updatedAt".into(), timestamp_value(Utc::now()));

        self.with_metadata_deadline(self.store.update(collections::USERS, &user.uid, fields))
            .await
    }

    pub async fn update_interests(&self, interests: Vec<String>) -> Result<(), AppError> {
        let user = self.require_user()?;
        let mut fields = Map::new();
        fields.insert("interests".into(), json!(interests));
        fields.insert("updatedAt".into(), timestamp_value(Utc::now()));
        self.with_metadata_deadline(self.store.update(collections::USERS, &user.uid, fields))
            .await
    }

    /// Add to the accumulated point counter, returning the new total.
    /// Field-level last-writer-wins; points are a fun counter, not a ledger.
    pub async fn award_points(&self, points: u32) -> Result<u32, AppError> {
        let user = self.require_user()?;
        let profile = self.load_or_create().await?;
        let total = profile.vibe_points.saturating_add(points);

        let mut fields = Map::new();
        fields.insert("vibePoints".into(), json!(total));
        fields.insert("updatedAt".into(), timestamp_value(Utc::now()));
        self.with_metadata_deadline(self.store.update(collections::USERS, &user.uid, fields))
            .await?;
        Ok(total)
    }

    /// Upload a new avatar and point the profile at it. The upload runs under
    /// the binary-upload deadline; the profile write that follows runs under
    /// the metadata deadline. A failure after a successful upload is reported
    /// as partial so the caller can retry just the profile write.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let user = self.require_user()?;
        let extension = validate_avatar(file_name, bytes.len())?;

        let path = format!(
            "users/{}/avatar-{}.{}",
            user.uid,
            Utc::now().timestamp_millis(),
            extension
        );
        let upload_secs = self.config.upload_timeout_secs;
        let url = tokio::time::timeout(
            Duration::from_secs(upload_secs),
            self.blobs.upload(&path, bytes),
        )
        .await
        .map_err(|_| AppError::Timeout(upload_secs))??;

        self.update_profile(ProfileUpdate {
            avatar: Some(url.clone()),
            ..Default::default()
        })
        .await
        .map_err(|err| {
            AppError::partial_failure("avatar upload", format!("profile update: {}", err))
        })?;

        Ok(url)
    }

    /// Remove the current avatar blob and clear the profile field.
    pub async fn remove_avatar(&self) -> Result<(), AppError> {
        let user = self.require_user()?;
        let profile = self.load_or_create().await?;
        let Some(url) = profile.avatar else {
            return Ok(());
        };

        if let Err(err) = self.blobs.delete_by_url(&url).await {
            // A missing blob is fine; the profile field still gets cleared.
            if !matches!(err, AppError::NotFound(_)) {
                return Err(err);
            }
        }

        let mut fields = Map::new();
        fields.insert("avatar".into(), Value::String(String::new()));
        fields.insert("updatedAt".into(), timestamp_value(Utc::now()));
        self.with_metadata_deadline(self.store.update(collections::USERS, &user.uid, fields))
            .await
    }
}

fn validate_avatar(file_name: &str, len: usize) -> Result<String, AppError> {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_AVATAR_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::validation(
            "please upload a JPEG, PNG or WebP image",
        ));
    }
    if len > MAX_AVATAR_BYTES {
        return Err(AppError::validation("image size must be less than 2MB"));
    }
    Ok(extension)
}
