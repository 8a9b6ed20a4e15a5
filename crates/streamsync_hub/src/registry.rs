//! Consumer site connectors.

use crate::error::{HubError, HubResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use streamsync_engine::DocumentStore;

/// Resolves a consumer name to a store over that consumer's site.
pub trait ConsumerRegistry: Send + Sync {
    /// Returns the site connector for a consumer.
    fn consumer_site(&self, name: &str) -> HubResult<Arc<dyn DocumentStore>>;
}

impl<R: ConsumerRegistry + ?Sized> ConsumerRegistry for Arc<R> {
    fn consumer_site(&self, name: &str) -> HubResult<Arc<dyn DocumentStore>> {
        (**self).consumer_site(name)
    }
}

/// A fixed set of connectors keyed by consumer name.
#[derive(Default)]
pub struct StaticRegistry {
    sites: RwLock<HashMap<String, Arc<dyn DocumentStore>>>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a consumer's connector.
    pub fn register(&self, name: impl Into<String>, site: Arc<dyn DocumentStore>) {
        self.sites.write().insert(name.into(), site);
    }

    /// Builder form of [`StaticRegistry::register`].
    pub fn with_site(self, name: impl Into<String>, site: Arc<dyn DocumentStore>) -> Self {
        self.register(name, site);
        self
    }

    /// Registered consumer names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sites.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ConsumerRegistry for StaticRegistry {
    fn consumer_site(&self, name: &str) -> HubResult<Arc<dyn DocumentStore>> {
        self.sites
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| HubError::UnknownConsumer(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsync_engine::MemoryStore;
    use streamsync_protocol::Record;

    #[test]
    fn registered_site_is_returned() {
        let store = Arc::new(MemoryStore::new());
        store.insert("Item", Record::named("ITEM-1"));
        let registry = StaticRegistry::new().with_site("east", store);

        let site = registry.consumer_site("east").unwrap();
        assert!(site.get("Item", "ITEM-1").is_ok());
        assert_eq!(registry.names(), vec!["east"]);
    }

    #[test]
    fn unknown_consumer_is_client_error() {
        let registry = StaticRegistry::new();
        let err = registry.consumer_site("nowhere").err().unwrap();
        assert!(matches!(err, HubError::UnknownConsumer(ref n) if n == "nowhere"));
        assert!(err.is_client_error());
    }
}
