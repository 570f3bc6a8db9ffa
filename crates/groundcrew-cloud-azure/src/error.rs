//! Azure provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("az CLI not found. Please install: https://aka.ms/install-azure-cli")]
    AzNotFound,

    #[error("not logged in: {0}")]
    AuthenticationFailed(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("transient service fault: {0}")]
    Transient(String),

    #[error("request rejected: {0}")]
    Semantic(String),

    #[error("az command failed: {0}")]
    CommandFailed(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AzureError> for groundcrew_cloud::CloudError {
    fn from(err: AzureError) -> Self {
        use groundcrew_cloud::CloudError;
        match err {
            AzureError::AzNotFound => CloudError::AuthenticationFailed(err.to_string()),
            AzureError::AuthenticationFailed(msg) => CloudError::AuthenticationFailed(msg),
            AzureError::NotFound(msg) => CloudError::ResourceNotFound(msg),
            AzureError::Transient(msg) => CloudError::Transient(msg),
            AzureError::Semantic(msg) => CloudError::Semantic(msg),
            AzureError::CommandFailed(msg) => CloudError::CommandFailed(msg),
            AzureError::Json(err) => CloudError::Json(err),
            AzureError::Io(err) => CloudError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
