use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use tokio::sync::watch;

use crate::backend::{AuthUser, DocumentStore, IdentityProvider, collections};
use crate::config::Config;
use crate::error::AppError;
use crate::models::UserProfile;

const MIN_PASSWORD_LEN: usize = 6;

/// Known university domains and their display names, beyond the generic
/// `.edu` / `.edu.au` rule.
const UNIVERSITY_DOMAINS: &[(&str, &str)] = &[
    ("rmit.edu.au", "RMIT University"),
    ("unimelb.edu.au", "University of Melbourne"),
    ("monash.edu", "Monash University"),
    ("monash.edu.au", "Monash University"),
    ("swinburne.edu.au", "Swinburne University"),
    ("deakin.edu.au", "Deakin University"),
    ("latrobe.edu.au", "La Trobe University"),
    ("anu.edu.au", "Australian National University"),
    ("unsw.edu.au", "UNSW Sydney"),
    ("usyd.edu.au", "University of Sydney"),
    ("uts.edu.au", "University of Technology Sydney"),
    ("mq.edu.au", "Macquarie University"),
];

fn email_domain(email: &str) -> Option<String> {
    let re = Regex::new(r"^[^@\s]+@([A-Za-z0-9][A-Za-z0-9.-]*)$").unwrap();
    re.captures(email).map(|caps| caps[1].to_lowercase())
}

/// Accepts `.edu` and `.edu.au` addresses plus the known-domain list.
pub fn validate_university_email(email: &str) -> bool {
    match email_domain(email) {
        Some(domain) => {
            domain.ends_with(".edu")
                || domain.ends_with(".edu.au")
                || UNIVERSITY_DOMAINS.iter().any(|(d, _)| *d == domain)
        }
        None => false,
    }
}

pub fn university_from_email(email: &str) -> String {
    let Some(domain) = email_domain(email) else {
        return "Unknown University".to_string();
    };
    UNIVERSITY_DOMAINS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| "University".to_string())
}

/// Account lifecycle over the identity port. All input validation happens
/// synchronously, before anything is sent to the backend.
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    config: Config,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        config: Config,
    ) -> Self {
        Self {
            identity,
            store,
            config,
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<AuthUser, AppError> {
        if !validate_university_email(email) {
            return Err(AppError::validation(
                "please sign up with your university email address",
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if password != confirm_password {
            return Err(AppError::validation("passwords do not match"));
        }

        let user = self.identity.sign_up(email, password).await?;

        // Seed the profile document. The account already exists, so a failure
        // here is a partial one; load_or_create heals it on next sign-in.
        let profile = self.default_profile(&user);
        let now = Utc::now();
        if let Err(err) = self
            .store
            .set(collections::USERS, &user.uid, profile.to_fields(now))
            .await
        {
            log::error!("failed to seed profile for {}: {}", user.uid, err);
            return Err(AppError::partial_failure(
                "account creation",
                format!("profile could not be saved: {}", err),
            ));
        }

        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("email and password are required"));
        }
        self.identity.sign_in(email, password).await
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.identity.sign_out().await
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.identity.current_user()
    }

    /// Subscribe to "current user changed" notifications.
    pub fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.identity.watch()
    }

    fn default_profile(&self, user: &AuthUser) -> UserProfile {
        UserProfile {
            id: user.uid.clone(),
            name: user.handle(),
            email: user.email.clone(),
            campus: self.config.default_campus.clone(),
            avatar: None,
            interests: Vec::new(),
            vibe_points: 0,
            created_at: Utc::now(),
        }
    }
}
