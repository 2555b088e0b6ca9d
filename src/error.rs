//! Error types for Studyflow.

use thiserror::Error;

/// Library-level error type for Studyflow operations.
#[derive(Error, Debug)]
pub enum StudyflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Could not parse model output: {0}")]
    SchemaParse(String),

    #[error("Web search failed: {0}")]
    Search(String),

    #[error("Video search failed: {0}")]
    VideoSearch(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl StudyflowError {
    /// Whether the error came from model output that did not match the expected shape.
    ///
    /// Only these errors advance an agent's fallback chain.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, StudyflowError::SchemaParse(_))
    }

    /// Whether the error should be reported to the client as a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StudyflowError::InvalidInput(_))
    }
}

/// Result type alias for Studyflow operations.
pub type Result<T> = std::result::Result<T, StudyflowError>;
