//! Store abstraction for producer and consumer sites.

use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streamsync_protocol::{Filters, ListQuery, Record};

/// Query primitives over a document store.
///
/// The producer is usually the local store; consumers are reached through a
/// remote site connector implementing the same trait.
pub trait DocumentStore: Send + Sync {
    /// Lists records of a doctype matching the query.
    fn list(&self, doctype: &str, query: &ListQuery) -> EngineResult<Vec<Record>>;

    /// Fetches a full document. Missing documents are an error.
    fn get(&self, doctype: &str, name: &str) -> EngineResult<Record>;

    /// Fetches selected fields of the first record matching the filters.
    fn get_value(
        &self,
        doctype: &str,
        fields: &[&str],
        filters: &Filters,
    ) -> EngineResult<Option<Record>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn list(&self, doctype: &str, query: &ListQuery) -> EngineResult<Vec<Record>> {
        (**self).list(doctype, query)
    }

    fn get(&self, doctype: &str, name: &str) -> EngineResult<Record> {
        (**self).get(doctype, name)
    }

    fn get_value(
        &self,
        doctype: &str,
        fields: &[&str],
        filters: &Filters,
    ) -> EngineResult<Option<Record>> {
        (**self).get_value(doctype, fields, filters)
    }
}

/// An in-memory store.
///
/// Records keep insertion order per doctype, which is also the order `list`
/// returns them in.
#[derive(Debug)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Vec<Record>>>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Creates a store from doctype → records.
    pub fn from_documents(documents: HashMap<String, Vec<Record>>) -> Self {
        let store = Self::new();
        for (doctype, records) in documents {
            for record in records {
                store.insert(&doctype, record);
            }
        }
        store
    }

    /// Inserts a record, replacing any record with the same `name`.
    pub fn insert(&self, doctype: &str, record: Record) {
        let mut documents = self.documents.write();
        let records = documents.entry(doctype.to_string()).or_default();
        let name = record.name();
        match records
            .iter_mut()
            .find(|r| name.is_some() && r.name() == name)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Removes a record by name.
    pub fn remove(&self, doctype: &str, name: &str) -> Option<Record> {
        let mut documents = self.documents.write();
        let records = documents.get_mut(doctype)?;
        let pos = records
            .iter()
            .position(|r| r.name().as_deref() == Some(name))?;
        Some(records.remove(pos))
    }

    /// Number of records of a doctype.
    pub fn len(&self, doctype: &str) -> usize {
        self.documents.read().get(doctype).map_or(0, Vec::len)
    }

    /// Returns true if the store holds no records of the doctype.
    pub fn is_empty(&self, doctype: &str) -> bool {
        self.len(doctype) == 0
    }

    /// Simulates connectivity loss; queries fail with a retryable error.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> EngineResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::store_retryable("store unavailable"))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(record: &Record, filters: &Filters, or_filters: &Filters) -> bool {
    let lookup = |field: &str| record.get(field).cloned();
    filters.match_all(lookup) && or_filters.match_any(lookup)
}

impl DocumentStore for MemoryStore {
    fn list(&self, doctype: &str, query: &ListQuery) -> EngineResult<Vec<Record>> {
        self.check_available()?;
        let documents = self.documents.read();
        Ok(documents
            .get(doctype)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches(r, &query.filters, &query.or_filters))
                    .map(|r| r.project(&query.fields))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get(&self, doctype: &str, name: &str) -> EngineResult<Record> {
        self.check_available()?;
        self.documents
            .read()
            .get(doctype)
            .and_then(|records| {
                records
                    .iter()
                    .find(|r| r.name().as_deref() == Some(name))
                    .cloned()
            })
            .ok_or_else(|| EngineError::not_found(doctype, name))
    }

    fn get_value(
        &self,
        doctype: &str,
        fields: &[&str],
        filters: &Filters,
    ) -> EngineResult<Option<Record>> {
        self.check_available()?;
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let documents = self.documents.read();
        Ok(documents.get(doctype).and_then(|records| {
            records
                .iter()
                .find(|r| matches(r, filters, &Filters::new()))
                .map(|r| r.project(&fields))
        }))
    }
}
