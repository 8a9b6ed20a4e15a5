//! Amendment chain resolution.

use crate::error::{EngineError, EngineResult};
use crate::store::DocumentStore;
use std::collections::HashSet;
use streamsync_protocol::{Record, NAME_FIELD};

/// Walks `amended_from` back-references to the original document.
pub struct ChainResolver<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    doctype: &'a str,
}

impl<'a, S: DocumentStore + ?Sized> ChainResolver<'a, S> {
    /// Creates a resolver over a store and doctype.
    pub fn new(store: &'a S, doctype: &'a str) -> Self {
        Self { store, doctype }
    }

    /// Returns the identifier of the chain's root (the document with no
    /// `amended_from`).
    ///
    /// A referenced document missing from the store is a
    /// [`EngineError::DocumentNotFound`]; revisiting a document is a
    /// [`EngineError::CorruptChain`].
    pub fn resolve_root(&self, document: &Record) -> EngineResult<String> {
        let mut current = self.name_of(document)?;
        let mut next = document.amended_from();
        let mut chain = vec![current.clone()];
        let mut visited: HashSet<String> = HashSet::from([current.clone()]);

        while let Some(predecessor) = next {
            chain.push(predecessor.clone());
            if !visited.insert(predecessor.clone()) {
                return Err(EngineError::CorruptChain {
                    doctype: self.doctype.to_string(),
                    chain,
                });
            }

            let doc = self.store.get(self.doctype, &predecessor)?;
            next = doc.amended_from();
            current = predecessor;
        }

        tracing::trace!(doctype = self.doctype, depth = chain.len(), root = %current, "resolved amendment chain");
        Ok(current)
    }

    fn name_of(&self, document: &Record) -> EngineResult<String> {
        document.name().ok_or_else(|| EngineError::MissingField {
            doctype: self.doctype.to_string(),
            field: NAME_FIELD.to_string(),
        })
    }
}

/// Convenience wrapper around [`ChainResolver::resolve_root`].
pub fn resolve_root<S: DocumentStore + ?Sized>(
    store: &S,
    doctype: &str,
    document: &Record,
) -> EngineResult<String> {
    ChainResolver::new(store, doctype).resolve_root(document)
}
