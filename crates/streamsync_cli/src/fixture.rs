//! Store fixtures backing the CLI.
//!
//! A fixture is a JSON file holding the producer's documents and each
//! consumer's documents:
//!
//! ```json
//! {
//!   "producer": {"Sales Invoice": [{"name": "SINV-1", "docstatus": 1}]},
//!   "consumers": {"branch-east": {"Sales Invoice": []}}
//! }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use streamsync_engine::{DocumentStore, MemoryStore};
use streamsync_hub::{JobQueue, StaticRegistry, StreamConfig, SyncHub};
use streamsync_protocol::Record;
use thiserror::Error;

/// Errors raised while loading a fixture.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// File could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Fixture path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// File is not a valid fixture.
    #[error("invalid fixture {path}: {source}")]
    Parse {
        /// Fixture path.
        path: String,
        /// Underlying error.
        source: serde_json::Error,
    },
}

type Documents = HashMap<String, Vec<Record>>;

/// Producer and consumer documents.
#[derive(Debug, Default, Deserialize)]
pub struct StoreFixture {
    /// Producer documents by doctype.
    #[serde(default)]
    pub producer: Documents,
    /// Consumer documents by consumer name, then doctype.
    #[serde(default)]
    pub consumers: HashMap<String, Documents>,
}

impl StoreFixture {
    /// Reads a fixture file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| FixtureError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Builds the producer store and consumer registry.
    pub fn into_stores(self) -> (Arc<dyn DocumentStore>, StaticRegistry) {
        let producer: Arc<dyn DocumentStore> = Arc::new(MemoryStore::from_documents(self.producer));
        let registry = StaticRegistry::new();
        for (name, documents) in self.consumers {
            registry.register(name, Arc::new(MemoryStore::from_documents(documents)));
        }
        (producer, registry)
    }
}

/// Loads configuration and fixture into a hub.
pub fn open_hub(
    config_path: &Path,
    store_path: &Path,
    queue: Arc<dyn JobQueue>,
) -> Result<SyncHub, Box<dyn std::error::Error>> {
    let config = StreamConfig::load(config_path)?;
    let (producer, registry) = StoreFixture::load(store_path)?.into_stores();
    tracing::debug!(
        consumers = registry.names().len(),
        "loaded store fixture from {}",
        store_path.display()
    );
    Ok(SyncHub::new(config, producer, Arc::new(registry), queue))
}
