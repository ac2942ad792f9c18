//! Error type shared across the workspace.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DueBotError>;

#[derive(Debug, Error)]
pub enum DueBotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API key missing for provider '{0}'")]
    ApiKeyMissing(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
