//! Operator payloads and the propagation task contract.

use crate::diff::{DiffEntry, UpdateType};
use crate::error::{ProtocolError, ProtocolResult};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selection posted by an operator to trigger propagation.
///
/// Extra fields are ignored so the whole hub form can be posted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Reference document type.
    pub ref_doctype: String,
    /// Selected diff entries.
    #[serde(default)]
    pub sync_hub_document: Vec<DiffEntry>,
}

impl SyncPayload {
    /// Creates a payload.
    pub fn new(ref_doctype: impl Into<String>, entries: Vec<DiffEntry>) -> Self {
        Self {
            ref_doctype: ref_doctype.into(),
            sync_hub_document: entries,
        }
    }

    /// Decodes and validates a JSON payload.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let payload: SyncPayload = serde_json::from_str(json)?;
        if payload.ref_doctype.trim().is_empty() {
            return Err(ProtocolError::MissingField("ref_doctype"));
        }
        Ok(payload)
    }
}

/// Outcome of a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// All selected entries were processed.
    Success,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Success => f.write_str("Success"),
        }
    }
}

/// Arguments handed to the propagation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationArgs {
    /// Full producer document.
    pub document: Record,
    /// Discrepancy kind.
    pub update_type: UpdateType,
}

/// Explicit execution context (site or tenant) for queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteContext(String);

impl SiteContext {
    /// Creates a context for the given site.
    pub fn new(site: impl Into<String>) -> Self {
        Self(site.into())
    }

    /// The site identifier.
    pub fn site(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
