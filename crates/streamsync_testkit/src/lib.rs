//! # StreamSync Testkit
//!
//! Test utilities for StreamSync.
//!
//! This crate provides:
//! - Store, amendment-chain and hub fixtures
//! - Property-based generators for rule conditions using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use streamsync_testkit::prelude::*;
//!
//! #[test]
//! fn reconciles_sample_hub() {
//!     let t = TestHub::sample();
//!     t.producer.insert(SALES_INVOICE, submitted("SINV-1"));
//!     let entries = t.hub.get_data(SALES_INVOICE).unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
