//! Error types for the reconciliation engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while computing a diff.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A referenced document does not exist in the store.
    #[error("{doctype} {name} not found")]
    DocumentNotFound {
        /// Document type.
        doctype: String,
        /// Document identifier.
        name: String,
    },

    /// An amendment chain loops back on itself.
    #[error("corrupt amendment chain for {doctype}: {}", chain.join(" -> "))]
    CorruptChain {
        /// Document type.
        doctype: String,
        /// Identifiers visited, ending with the repeated one.
        chain: Vec<String>,
    },

    /// A timestamp under comparison is missing or unparseable.
    #[error("invalid {field} timestamp on {doctype} {name}: {value:?}")]
    InvalidTimestamp {
        /// Document type.
        doctype: String,
        /// Document identifier.
        name: String,
        /// Field that was read.
        field: &'static str,
        /// Raw value, if any.
        value: Option<String>,
    },

    /// A record is missing a field the engine relies on.
    #[error("{doctype} record missing field {field}")]
    MissingField {
        /// Document type.
        doctype: String,
        /// Missing field.
        field: String,
    },

    /// Store or connector failure.
    #[error("store error: {message}")]
    Store {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },
}

impl EngineError {
    /// Creates a retryable store error.
    pub fn store_retryable(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable store error.
    pub fn store_fatal(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(doctype: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DocumentNotFound {
            doctype: doctype.into(),
            name: name.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(EngineError::store_retryable("connection reset").is_retryable());
        assert!(!EngineError::store_fatal("permission denied").is_retryable());
        assert!(!EngineError::not_found("Item", "ITEM-1").is_retryable());
    }

    #[test]
    fn error_display() {
        let err = EngineError::not_found("Sales Invoice", "SINV-0001");
        assert_eq!(err.to_string(), "Sales Invoice SINV-0001 not found");

        let err = EngineError::CorruptChain {
            doctype: "Sales Invoice".into(),
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert!(err.to_string().contains("A -> B -> A"));
    }
}
