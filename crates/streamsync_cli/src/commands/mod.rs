//! CLI command implementations.

pub mod diff;
pub mod search;
pub mod sync;
