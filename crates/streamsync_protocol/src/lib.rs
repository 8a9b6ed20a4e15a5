//! # StreamSync Protocol
//!
//! Data types shared by the StreamSync reconciliation engine and hub.
//!
//! This crate provides:
//! - `Filters`, `FilterSet` and `ListQuery` for store queries
//! - `Record` for documents returned by producer and consumer stores
//! - `DiffEntry` / `UpdateType` for reconciliation results
//! - `SyncPayload`, `PropagationArgs` and `SiteContext` for dispatch
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod error;
mod filter;
mod payload;
mod record;

pub use diff::{DiffEntry, UpdateType};
pub use error::{ProtocolError, ProtocolResult};
pub use filter::{FieldValue, FilterSet, Filters, ListQuery, Predicate};
pub use payload::{PropagationArgs, SiteContext, SyncPayload, SyncStatus};
pub use record::{
    parse_timestamp, Record, AMENDED_FROM_FIELD, DOCSTATUS_FIELD, DOCSTATUS_SUBMITTED,
    MODIFIED_FIELD, NAME_FIELD,
};
