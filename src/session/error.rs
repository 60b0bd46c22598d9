use std::fmt;

use thiserror::Error;

use crate::services::ollama::models::TransportError;
use crate::tools::ToolExecutionError;

/// Hint attached to failed inference calls and to timeouts.
pub const TIMEOUT_HINT: &str =
    "consider increasing the read and write timeouts if the model needs more time to answer";

/// Errors raised by a [`Session`](crate::Session).
///
/// Every error is scoped to the call that raised it; the session stays usable
/// afterwards (see [`Error::Unavailable`] for the one exception).
#[derive(Debug, Error)]
pub enum Error {
    /// Bad argument shape, type or range. Raised before any network call and
    /// never leaves partial state behind.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The call needs an active model, a different mode or a capability the
    /// active model lacks.
    #[error("Not ready: {0}")]
    NotReady(String),
    /// The server cannot be reached. After a failed address change the session
    /// keeps failing with this error until a reachable address is set.
    #[error("Server unavailable: {0}")]
    Unavailable(String),
    /// The server (or the transport talking to it) reported a failure.
    #[error("{0}")]
    Remote(RemoteError),
    /// A tool call named a tool that is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    /// A registered tool failed while running.
    #[error("Tool error: {0}")]
    ToolExecution(ToolExecutionError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failure reported by the server, with an optional remediation hint.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub source: TransportError,
    pub hint: Option<&'static str>,
}

impl RemoteError {
    /// Wraps a failed management call; the hint is only added for timeouts.
    pub fn management(source: TransportError) -> Self {
        let hint = source.is_timeout().then_some(TIMEOUT_HINT);
        Self { source, hint }
    }

    /// Wraps a failed inference call, which always carries the timeout hint.
    pub fn inference(source: TransportError) -> Self {
        Self { source, hint: Some(TIMEOUT_HINT) }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hint {
            Some(hint) => write!(f, "Remote error: {}; {hint}", self.source),
            None => write!(f, "Remote error: {}", self.source),
        }
    }
}

impl Error {
    pub(crate) fn validation<T: Into<String>>(msg: T) -> Self {
        Error::Validation(msg.into())
    }

    pub(crate) fn not_ready<T: Into<String>>(msg: T) -> Self {
        Error::NotReady(msg.into())
    }

    pub(crate) fn management(source: TransportError) -> Self {
        Error::Remote(RemoteError::management(source))
    }

    pub(crate) fn inference(source: TransportError) -> Self {
        Error::Remote(RemoteError::inference(source))
    }
}

impl From<ToolExecutionError> for Error {
    fn from(err: ToolExecutionError) -> Self {
        match err {
            ToolExecutionError::ToolNotFound(name) => Error::UnknownTool(name),
            ToolExecutionError::ArgumentParsingError(msg) => Error::Validation(msg),
            other => Error::ToolExecution(other),
        }
    }
}
