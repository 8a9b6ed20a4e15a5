//! Error types for the reconciliation hub.

use streamsync_engine::EngineError;
use streamsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Errors that can occur in the hub.
#[derive(Error, Debug)]
pub enum HubError {
    /// Configuration could not be parsed or is inconsistent.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error while reading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A rule references a consumer with no registered site.
    #[error("unknown consumer: {0}")]
    UnknownConsumer(String),

    /// Job queue failure.
    #[error("job queue error: {message}")]
    Queue {
        /// Error message.
        message: String,
    },

    /// Diff engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Malformed operator payload.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Request is well-formed but cannot be served.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl HubError {
    /// Creates a queue error.
    pub fn queue(message: impl Into<String>) -> Self {
        Self::Queue {
            message: message.into(),
        }
    }

    /// Returns true if the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HubError::Protocol(_) | HubError::InvalidRequest(_) | HubError::UnknownConsumer(_)
        )
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            HubError::Engine(e) => e.is_retryable(),
            HubError::Queue { .. } => true,
            _ => false,
        }
    }
}

impl From<toml::de::Error> for HubError {
    fn from(err: toml::de::Error) -> Self {
        HubError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(HubError::InvalidRequest("bad".into()).is_client_error());
        assert!(HubError::UnknownConsumer("east".into()).is_client_error());
        assert!(!HubError::queue("down").is_client_error());

        assert!(HubError::queue("down").is_retryable());
        assert!(HubError::Engine(EngineError::store_retryable("reset")).is_retryable());
        assert!(!HubError::Engine(EngineError::not_found("Item", "X")).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = HubError::Engine(EngineError::not_found("Item", "ITEM-1"));
        assert_eq!(err.to_string(), "Item ITEM-1 not found");

        let err = HubError::UnknownConsumer("branch-east".into());
        assert!(err.to_string().contains("branch-east"));
    }
}
