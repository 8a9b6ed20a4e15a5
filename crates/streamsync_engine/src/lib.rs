//! # StreamSync Engine
//!
//! Reconciliation engine comparing a producer document store with consumer
//! sites.
//!
//! This crate provides:
//! - Condition parsing (`doc.field == "value" and ...` → filters)
//! - Amendment chain resolution with cycle detection
//! - Two-phase diffing (missing records, outdated amendments)
//! - The `DocumentStore` abstraction and an in-memory store
//!
//! ## Architecture
//!
//! For each reconciliation rule the engine:
//! 1. Lists current producer documents and the consumer's matching set, and
//!    reports producer identities the consumer lacks as `Create`
//! 2. Lists submitted producer amendments and reports those whose consumer
//!    counterpart is older as `Update`
//!
//! ## Key Invariants
//!
//! - The engine only reads from stores
//! - Rules are independent; results accumulate in rule order
//! - Condition problems never fail a run; they are reported as diagnostics
//! - Broken amendment chains always fail a run

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod chain;
mod condition;
mod config;
mod diff;
mod error;
mod store;

pub use chain::{resolve_root, ChainResolver};
pub use condition::{parse_condition, ConditionDiagnostic, ParsedCondition};
pub use config::{AmendMode, DiffConfig, ReconRule, ITEM_CODE_FIELD, ITEM_DOCTYPE};
pub use diff::{DiffEngine, DiffReport, DiffStats};
pub use error::{EngineError, EngineResult};
pub use store::{DocumentStore, MemoryStore};
