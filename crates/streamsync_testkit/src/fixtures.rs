//! Test fixtures and hub helpers.
//!
//! Provides convenience functions for building producer/consumer stores,
//! amendment chains and fully wired hubs.

use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use streamsync_engine::MemoryStore;
use streamsync_hub::{MemoryJobQueue, StaticRegistry, StreamConfig, SyncHub};
use streamsync_protocol::{
    Record, AMENDED_FROM_FIELD, DOCSTATUS_FIELD, DOCSTATUS_SUBMITTED, MODIFIED_FIELD,
};
use tempfile::TempDir;

/// Doctype used by the sample configuration.
pub const SALES_INVOICE: &str = "Sales Invoice";

/// Timestamp used when a fixture does not care about `modified`.
pub const DEFAULT_MODIFIED: &str = "2025-01-01 00:00:00";

/// Configuration with two manual consumers and one realtime rule.
pub const SAMPLE_CONFIG: &str = r#"
[dispatch]
task = "stream_sync.propagate"
queue = "default"

[[consumers]]
name = "branch-east"
site = "https://east.example.com"

[[consumers.doctypes]]
ref_doctype = "Sales Invoice"
stream_type = "Manual"
amend_mode = "Update Source"
condition = 'doc.company == "ACME"'

[[consumers.doctypes]]
ref_doctype = "Customer"
stream_type = "Realtime"

[[consumers]]
name = "branch-west"
site = "https://west.example.com"

[[consumers.doctypes]]
ref_doctype = "Sales Invoice"
stream_type = "Manual"

[[consumers.doctypes]]
ref_doctype = "Item"
stream_type = "Manual"
"#;

/// Parses [`SAMPLE_CONFIG`].
pub fn sample_config() -> StreamConfig {
    StreamConfig::from_toml_str(SAMPLE_CONFIG).expect("sample config is valid")
}

/// A submitted document.
pub fn submitted(name: &str) -> Record {
    Record::named(name)
        .with(DOCSTATUS_FIELD, DOCSTATUS_SUBMITTED)
        .with(MODIFIED_FIELD, DEFAULT_MODIFIED)
}

/// A submitted amendment of `from`.
pub fn amendment(name: &str, from: &str, modified: &str) -> Record {
    Record::named(name)
        .with(DOCSTATUS_FIELD, DOCSTATUS_SUBMITTED)
        .with(AMENDED_FROM_FIELD, from)
        .with(MODIFIED_FIELD, modified)
}

/// A document modified at the given time.
pub fn modified_at(name: &str, modified: &str) -> Record {
    Record::named(name).with(MODIFIED_FIELD, modified)
}

/// Inserts a chain `names[0] <- names[1] <- ...` into `store`.
///
/// The first document is the original; every later one amends its
/// predecessor. All share the same `modified`.
pub fn insert_chain(store: &MemoryStore, doctype: &str, names: &[&str], modified: &str) {
    let mut previous: Option<&str> = None;
    for &name in names {
        let record = match previous {
            Some(from) => amendment(name, from, modified),
            None => submitted(name).with(MODIFIED_FIELD, modified),
        };
        store.insert(doctype, record);
        previous = Some(name);
    }
}

/// Builds a store holding `records` under `doctype`.
pub fn store_with(doctype: &str, records: impl IntoIterator<Item = Record>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for record in records {
        store.insert(doctype, record);
    }
    store
}

/// Builds a store from a JSON object of doctype → array of records.
pub fn store_from_json(value: Value) -> Arc<MemoryStore> {
    let documents: HashMap<String, Vec<Record>> =
        serde_json::from_value(value).expect("fixture JSON has the store shape");
    Arc::new(MemoryStore::from_documents(documents))
}

/// A hub wired to in-memory stores and queue.
pub struct TestHub {
    /// The hub.
    pub hub: SyncHub,
    /// Producer store.
    pub producer: Arc<MemoryStore>,
    /// Consumer stores by consumer name.
    pub consumers: HashMap<String, Arc<MemoryStore>>,
    /// Job queue.
    pub queue: Arc<MemoryJobQueue>,
}

impl TestHub {
    /// Creates a hub with an empty store for every configured consumer.
    pub fn new(config: StreamConfig) -> Self {
        let producer = Arc::new(MemoryStore::new());
        let registry = StaticRegistry::new();
        let mut consumers = HashMap::new();
        for consumer in &config.consumers {
            let store = Arc::new(MemoryStore::new());
            registry.register(consumer.name.clone(), store.clone());
            consumers.insert(consumer.name.clone(), store);
        }
        let queue = Arc::new(MemoryJobQueue::new());
        let hub = SyncHub::new(config, producer.clone(), Arc::new(registry), queue.clone());
        Self {
            hub,
            producer,
            consumers,
            queue,
        }
    }

    /// Creates a hub over [`sample_config`].
    pub fn sample() -> Self {
        Self::new(sample_config())
    }

    /// The store of a configured consumer.
    pub fn consumer(&self, name: &str) -> &MemoryStore {
        self.consumers
            .get(name)
            .unwrap_or_else(|| panic!("no consumer named {name}"))
    }
}

/// A config file in a temporary directory.
pub struct TempConfig {
    /// Path to the written file.
    pub path: PathBuf,
    _dir: TempDir,
}

/// Writes TOML to a temporary `hub.toml`.
pub fn write_config(toml: &str) -> TempConfig {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("hub.toml");
    let mut file = std::fs::File::create(&path).expect("Failed to create config file");
    file.write_all(toml.as_bytes())
        .expect("Failed to write config file");
    TempConfig { path, _dir: dir }
}
