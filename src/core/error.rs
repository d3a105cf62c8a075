use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("API key is not configured (set GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,

    #[error("Response contained no text")]
    EmptyResponse,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown mood: {0}")]
    UnknownMood(String),

    #[error("Contact name must not be empty")]
    EmptyName,

    #[error("Country code must start with '+': {0}")]
    InvalidCountryCode(String),

    #[error("Phone number must contain at least 10 digits: {0}")]
    InvalidPhoneNumber(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
