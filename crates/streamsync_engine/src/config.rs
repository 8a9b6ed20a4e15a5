//! Configuration for the diff engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use streamsync_protocol::NAME_FIELD;

/// Doctype whose identity key is not `name`.
pub const ITEM_DOCTYPE: &str = "Item";
/// Identity key used for [`ITEM_DOCTYPE`].
pub const ITEM_CODE_FIELD: &str = "item_code";

/// How amended producer documents are matched to consumer records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmendMode {
    /// Compare against the consumer copy of the amended document itself.
    #[default]
    Default,
    /// Compare against the consumer copy of the chain's original document.
    #[serde(rename = "Update Source")]
    UpdateSource,
}

/// A per-consumer reconciliation rule as seen by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconRule {
    /// Optional condition expression.
    pub condition: Option<String>,
    /// Amendment handling mode.
    pub amend_mode: AmendMode,
}

impl ReconRule {
    /// Creates a rule with no condition and default amend mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Sets the amend mode.
    pub fn with_amend_mode(mut self, mode: AmendMode) -> Self {
        self.amend_mode = mode;
        self
    }
}

/// Configuration for diff computation.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Doctype → identity key overrides.
    identity_keys: HashMap<String, String>,
}

impl DiffConfig {
    /// Creates the default configuration (`Item` keyed by `item_code`).
    pub fn new() -> Self {
        let mut identity_keys = HashMap::new();
        identity_keys.insert(ITEM_DOCTYPE.to_string(), ITEM_CODE_FIELD.to_string());
        Self { identity_keys }
    }

    /// Overrides the identity key for a doctype.
    pub fn with_identity_key(mut self, doctype: impl Into<String>, field: impl Into<String>) -> Self {
        self.identity_keys.insert(doctype.into(), field.into());
        self
    }

    /// Field used to match producer and consumer records of a doctype.
    pub fn identity_key(&self, doctype: &str) -> &str {
        self.identity_keys
            .get(doctype)
            .map(String::as_str)
            .unwrap_or(NAME_FIELD)
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keys() {
        let config = DiffConfig::default();
        assert_eq!(config.identity_key("Item"), "item_code");
        assert_eq!(config.identity_key("Sales Invoice"), "name");

        let config = config.with_identity_key("Customer", "customer_code");
        assert_eq!(config.identity_key("Customer"), "customer_code");
    }

    #[test]
    fn amend_mode_names() {
        let mode: AmendMode = serde_json::from_str(r#""Update Source""#).unwrap();
        assert_eq!(mode, AmendMode::UpdateSource);
        let mode: AmendMode = serde_json::from_str(r#""Default""#).unwrap();
        assert_eq!(mode, AmendMode::Default);
    }

    #[test]
    fn rule_builder() {
        let rule = ReconRule::new()
            .with_condition("doc.company == \"ACME\"")
            .with_amend_mode(AmendMode::UpdateSource);
        assert_eq!(rule.condition.as_deref(), Some("doc.company == \"ACME\""));
        assert_eq!(rule.amend_mode, AmendMode::UpdateSource);
    }
}
