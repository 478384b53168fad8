//! Formula metadata lookup
//!
//! This module provides the formula metadata record and the local cache it
//! is stored in, populated from `brew info` and read by the dependency graph.

mod cache;
mod formula;

pub use cache::{MetadataCache, MetadataSource};
pub use formula::Formula;

#[cfg(test)]
pub use cache::MockMetadataSource;
