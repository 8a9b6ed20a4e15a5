//! Diff result entries.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of discrepancy between producer and consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateType {
    /// Present on the producer, missing on the consumer.
    Create,
    /// Amended on the producer after the consumer's copy was last modified.
    Update,
}

impl UpdateType {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Create => "Create",
            UpdateType::Update => "Update",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s {
            "Create" => Ok(UpdateType::Create),
            "Update" => Ok(UpdateType::Update),
            other => Err(ProtocolError::UnknownUpdateType(other.to_string())),
        }
    }
}

/// One detected discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Producer document identifier.
    pub document: String,
    /// Discrepancy kind.
    pub update_type: UpdateType,
}

impl DiffEntry {
    /// A `Create` entry.
    pub fn create(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            update_type: UpdateType::Create,
        }
    }

    /// An `Update` entry.
    pub fn update(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            update_type: UpdateType::Update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_type_names() {
        assert_eq!("Create".parse::<UpdateType>().unwrap(), UpdateType::Create);
        assert_eq!(UpdateType::Update.to_string(), "Update");
        assert!(matches!(
            "Delete".parse::<UpdateType>(),
            Err(ProtocolError::UnknownUpdateType(_))
        ));
    }

    #[test]
    fn entry_json_shape() {
        let json = serde_json::to_string(&DiffEntry::create("SINV-0001")).unwrap();
        assert_eq!(json, r#"{"document":"SINV-0001","update_type":"Create"}"#);
    }
}
