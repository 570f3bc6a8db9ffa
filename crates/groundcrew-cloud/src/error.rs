//! Cloud provider error types
//!
//! The taxonomy drives control flow: transient faults are retried with
//! backoff, semantic faults abort the current step immediately, and
//! provider-side "not found" is normalized into [`Existence::NotFound`]
//! by the probe rather than surfacing here.
//!
//! [`Existence::NotFound`]: crate::provider::Existence

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    /// Timeout, throttling, temporary unavailability. Safe to retry.
    #[error("transient provider fault: {0}")]
    Transient(String),

    /// Bad parameter, quota exceeded, invalid name. Retrying cannot help.
    #[error("provider rejected request: {0}")]
    Semantic(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("settings file error: {0}")]
    SettingsError(String),

    #[error(transparent)]
    Core(#[from] groundcrew_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    /// Whether the retry utility may re-attempt the failed operation
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
