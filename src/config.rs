use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub api_key: String,
    pub storage_bucket: String,
    pub default_campus: String,
    pub metadata_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        Ok(Config {
            project_id: env::var("CAMPUSVIBE_PROJECT_ID")
                .unwrap_or_else(|_| "campusvibe-dev".to_string()),
            api_key: env::var("CAMPUSVIBE_API_KEY").unwrap_or_else(|_| "local-dev-key".to_string()),
            storage_bucket: env::var("CAMPUSVIBE_STORAGE_BUCKET")
                .unwrap_or_else(|_| "campusvibe-dev.appspot.com".to_string()),
            default_campus: env::var("CAMPUSVIBE_DEFAULT_CAMPUS")
                .unwrap_or_else(|_| "RMIT University".to_string()),
            metadata_timeout_secs: env::var("CAMPUSVIBE_METADATA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            upload_timeout_secs: env::var("CAMPUSVIBE_UPLOAD_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
