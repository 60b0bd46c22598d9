use thiserror::Error;

/// Failures surfaced by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The request never produced a response (connection refused, DNS, ...).
    #[error("Request Error: {0}")]
    Request(String),
    /// The server did not answer within the configured timeouts.
    #[error("Timeout Error: {0}")]
    Timeout(String),
    /// The server answered with a non-success status.
    #[error("API Error ({status}): {message}")]
    Api { status: u16, message: String },
    /// The reply could not be decoded into the expected structure.
    #[error("Serialization Error: {0}")]
    Serialization(String),
    /// The server answered but reported that the operation did not complete.
    #[error("Operation Error: {0}")]
    Incomplete(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_decode() {
            TransportError::Serialization(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}
