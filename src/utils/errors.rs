// Error types for Keydeck

use thiserror::Error;

/// Main error type for Keydeck
#[derive(Error, Debug)]
pub enum KeydeckError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("Encryption error: {0}")]
    Encode(String),

    #[error("Decryption error: {0}")]
    Decode(String),

    #[error("Remote API returned HTTP {status}: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage write rejected: {0}")]
    StorageWrite(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Dialoguer error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl KeydeckError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        KeydeckError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any state was touched
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            KeydeckError::Validation { .. } | KeydeckError::NotFound(_)
        )
    }
}

/// Result type alias for Keydeck
pub type Result<T> = std::result::Result<T, KeydeckError>;

impl From<anyhow::Error> for KeydeckError {
    fn from(err: anyhow::Error) -> Self {
        KeydeckError::Unknown(err.to_string())
    }
}

impl From<reqwest::Error> for KeydeckError {
    fn from(err: reqwest::Error) -> Self {
        KeydeckError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = KeydeckError::validation("endpointUrl", "must be an absolute URL");
        assert_eq!(err.to_string(), "Invalid endpointUrl: must be an absolute URL");
        assert!(err.is_precondition());
    }

    #[test]
    fn test_remote_error_is_not_precondition() {
        let err = KeydeckError::RemoteApi {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert!(!err.is_precondition());
        assert!(err.to_string().contains("401"));
    }
}
