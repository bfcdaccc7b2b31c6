//! Error types for the market-data client.

use thiserror::Error;


/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed (connect, timeout, body decoding).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Query parameters could not be encoded.
    #[error("Invalid query parameters: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),

    /// Upstream returned a non-2xx response.
    #[error("Upstream error ({status}): {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// No API key is configured.
    #[error("No API keys available")]
    NoCredentials,

    /// The key store could not be used.
    #[error("Key store error: {0}")]
    KeyStore(String),
}

impl Error {
    /// Returns the upstream HTTP status, when the upstream answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns the upstream response body, if one was received.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Key store and rotation errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The credential set is empty.
    #[error("No API keys available")]
    NoCredentials,

    /// The key is already registered.
    #[error("API key {0} already exists")]
    Duplicate(String),

    /// The key is not registered.
    #[error("API key {0} not found")]
    NotFound(String),

    /// An empty key was supplied.
    #[error("API key cannot be empty")]
    EmptyKey,

    /// Reading or writing the key file failed.
    #[error("key file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The key file could not be encoded.
    #[error("key file encoding failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The blocking key store task panicked or was cancelled.
    #[error("key store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<KeyError> for Error {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::NoCredentials => Error::NoCredentials,
            other => Error::KeyStore(other.to_string()),
        }
    }
}
