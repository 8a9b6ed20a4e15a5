//! Error types for protocol payloads.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding operator payloads.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload was not valid JSON or had the wrong shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Update type other than `Create` or `Update`.
    #[error("unknown update type: {0}")]
    UnknownUpdateType(String),

    /// A required payload field was empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),
}
