//! Hub configuration.
//!
//! Consumers and their per-doctype rules are loaded from TOML:
//!
//! ```toml
//! [dispatch]
//! task = "stream_sync.propagate"
//! queue = "long"
//!
//! [[consumers]]
//! name = "branch-east"
//! site = "https://east.example.com"
//!
//! [[consumers.doctypes]]
//! ref_doctype = "Sales Invoice"
//! stream_type = "Manual"
//! amend_mode = "Update Source"
//! condition = 'doc.company == "ACME"'
//! ```

use crate::error::{HubError, HubResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;
use streamsync_engine::{AmendMode, ReconRule};

/// Default propagation task name.
pub const DEFAULT_PROPAGATION_TASK: &str = "stream_sync.propagate";

/// How a consumer doctype is kept in sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StreamType {
    /// Reconciled on demand through the hub.
    Manual,
    /// Any other mode; never reconciled by the hub.
    Other(String),
}

impl StreamType {
    /// Returns true for [`StreamType::Manual`].
    pub fn is_manual(&self) -> bool {
        matches!(self, StreamType::Manual)
    }
}

impl From<String> for StreamType {
    fn from(value: String) -> Self {
        if value == "Manual" {
            StreamType::Manual
        } else {
            StreamType::Other(value)
        }
    }
}

impl From<StreamType> for String {
    fn from(value: StreamType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamType::Manual => f.write_str("Manual"),
            StreamType::Other(s) => f.write_str(s),
        }
    }
}

/// A consumer's rule for one reference doctype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerDoctypeRule {
    /// Reference doctype.
    pub ref_doctype: String,
    /// Sync mode.
    pub stream_type: StreamType,
    /// Amendment handling.
    #[serde(default)]
    pub amend_mode: AmendMode,
    /// Optional condition expression.
    #[serde(default)]
    pub condition: Option<String>,
}

impl ConsumerDoctypeRule {
    /// The engine's view of this rule.
    pub fn to_rule(&self) -> ReconRule {
        ReconRule {
            condition: self.condition.clone(),
            amend_mode: self.amend_mode,
        }
    }
}

/// A downstream site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConsumer {
    /// Consumer identifier used to look up its site connector.
    pub name: String,
    /// Site address, informational.
    #[serde(default)]
    pub site: Option<String>,
    /// Doctype rules.
    #[serde(default)]
    pub doctypes: Vec<ConsumerDoctypeRule>,
}

/// Propagation job queue class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueClass {
    /// Default queue.
    #[default]
    Default,
    /// Short-running jobs.
    Short,
    /// Long-running jobs.
    Long,
}

impl fmt::Display for QueueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueClass::Default => f.write_str("default"),
            QueueClass::Short => f.write_str("short"),
            QueueClass::Long => f.write_str("long"),
        }
    }
}

/// Configuration for propagation dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Task executed by queue workers.
    pub task: String,
    /// Queue class jobs are placed on.
    pub queue: QueueClass,
    /// Hold jobs until the dispatch batch commits.
    pub enqueue_after_commit: bool,
}

impl DispatchConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            task: DEFAULT_PROPAGATION_TASK.to_string(),
            queue: QueueClass::Default,
            enqueue_after_commit: true,
        }
    }

    /// Sets the task name.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Sets the queue class.
    pub fn with_queue(mut self, queue: QueueClass) -> Self {
        self.queue = queue;
        self
    }

    /// Sets whether jobs wait for the batch to commit.
    pub fn with_enqueue_after_commit(mut self, defer: bool) -> Self {
        self.enqueue_after_commit = defer;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Full hub configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Consumers in reconciliation order.
    #[serde(default)]
    pub consumers: Vec<StreamConsumer>,
}

impl StreamConfig {
    /// Parses and validates TOML.
    pub fn from_toml_str(text: &str) -> HubResult<Self> {
        let config: StreamConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> HubResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Checks consumer names are unique and rules name a doctype.
    pub fn validate(&self) -> HubResult<()> {
        let mut names = HashSet::new();
        for consumer in &self.consumers {
            if consumer.name.trim().is_empty() {
                return Err(HubError::Config("consumer name must not be empty".into()));
            }
            if !names.insert(consumer.name.as_str()) {
                return Err(HubError::Config(format!(
                    "duplicate consumer: {}",
                    consumer.name
                )));
            }
            if consumer.doctypes.iter().any(|r| r.ref_doctype.trim().is_empty()) {
                return Err(HubError::Config(format!(
                    "consumer {} has a rule without ref_doctype",
                    consumer.name
                )));
            }
        }
        Ok(())
    }

    /// Manual rules for a doctype, in consumer order.
    pub fn manual_rules<'a>(
        &'a self,
        ref_doctype: &'a str,
    ) -> impl Iterator<Item = (&'a StreamConsumer, &'a ConsumerDoctypeRule)> + 'a {
        self.consumers.iter().flat_map(move |consumer| {
            consumer
                .doctypes
                .iter()
                .filter(move |rule| rule.ref_doctype == ref_doctype && rule.stream_type.is_manual())
                .map(move |rule| (consumer, rule))
        })
    }

    /// Distinct doctypes with at least one manual rule, sorted.
    pub fn manual_doctypes(&self) -> BTreeSet<&str> {
        self.consumers
            .iter()
            .flat_map(|c| c.doctypes.iter())
            .filter(|r| r.stream_type.is_manual())
            .map(|r| r.ref_doctype.as_str())
            .collect()
    }
}
