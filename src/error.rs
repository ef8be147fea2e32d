use thiserror::Error;

/// Central error type for the sync core
#[derive(Debug, Error)]
pub enum AppError {
    /// Database error (rusqlite)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
    /// Stored JSON column could not be (de)serialised
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Configuration file could not be parsed or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
    /// Remote client could not be constructed
    #[error("Remote client error: {0}")]
    Remote(#[from] remote_client::ClientError),
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Validation error (e.g. invalid inputs)
    #[error("Validation error: {0}")]
    Validation(String),
    /// General error
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}
