use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Partial failure: {completed} succeeded, but {failed}")]
    PartialFailure { completed: String, failed: String },

    #[error("Operation timed out after {0}s")]
    Timeout(u64),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        AppError::Transport(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn partial_failure(completed: impl Into<String>, failed: impl Into<String>) -> Self {
        AppError::PartialFailure {
            completed: completed.into(),
            failed: failed.into(),
        }
    }

    /// True for errors the caller may retry without changing input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::PartialFailure { .. }
                | AppError::Timeout(_)
        )
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        log::error!("Anyhow error: {}", error);
        AppError::Transport(error.to_string())
    }
}
