//! # StreamSync Hub
//!
//! Operator-facing reconciliation hub for StreamSync.
//!
//! This crate provides:
//! - Consumer and rule configuration loaded from TOML
//! - The consumer registry resolving consumer names to site connectors
//! - Diff entry points across every manual rule of a doctype
//! - Propagation dispatch onto a job queue, deduplicated per document
//! - The reference-doctype lookup helper
//!
//! # Architecture
//!
//! ```text
//! SyncHub ──get_data──▶ DiffEngine ──▶ producer + consumer DocumentStores
//!    │
//!    └──sync──▶ SyncDispatcher ──▶ DispatchBatch ──commit──▶ JobQueue
//! ```
//!
//! # Dispatch
//!
//! Every selected entry becomes one `PropagationJob` carrying the full
//! producer document. Jobs are keyed by a SHA-256 idempotency key over
//! site, task, doctype, document and update type:
//! 1. Keys already pending on the queue are skipped
//! 2. Repeated entries in one payload collapse into one job
//! 3. `enqueue_unique` rejects a key that a concurrent dispatch queued first
//!
//! ```rust,ignore
//! use streamsync_hub::{MemoryJobQueue, StaticRegistry, StreamConfig, SyncHub};
//! use streamsync_protocol::SiteContext;
//!
//! let config = StreamConfig::load("hub.toml")?;
//! let hub = SyncHub::new(config, producer, Arc::new(registry), Arc::new(MemoryJobQueue::new()));
//! let entries = hub.get_data("Sales Invoice")?;
//! hub.sync_json(&SiteContext::new("hub.local"), payload)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod config;
mod dispatcher;
mod error;
mod hub;
mod lookup;
mod queue;
mod registry;

pub use config::{
    ConsumerDoctypeRule, DispatchConfig, QueueClass, StreamConfig, StreamConsumer, StreamType,
    DEFAULT_PROPAGATION_TASK,
};
pub use dispatcher::{DispatchBatch, DispatchSummary, SyncDispatcher};
pub use error::{HubError, HubResult};
pub use hub::SyncHub;
pub use lookup::search_doctypes;
pub use queue::{idempotency_key, EnqueueOutcome, JobQueue, JobState, MemoryJobQueue, PropagationJob};
pub use registry::{ConsumerRegistry, StaticRegistry};
