// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Carries Notion error codes so callers can pick skip, fallback, or abort

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status} ({code}) on {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        code: String,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Front matter error: {0}")]
    Frontmatter(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 1,
            Error::Network(_) => 3,
            Error::Api { .. } => 4,
            Error::Parse(_) => 5,
            Error::Filesystem(_) => 6,
            Error::Frontmatter(_) => 7,
        }
    }

    /// Notion error code string (`object_not_found`, `conflict_error`, ...), if any.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn is_object_not_found(&self) -> bool {
        self.api_code() == Some("object_not_found")
    }

    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some("conflict_error")
    }

    /// Deleting a block that is already archived comes back as a validation error.
    pub fn is_archived_block(&self) -> bool {
        match self {
            Error::Api { code, message, .. } => {
                code == "validation_error" && message.contains("archived")
            }
            _ => false,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Frontmatter(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
