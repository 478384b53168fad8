//! Brew dependency graph
//!
//! This module tracks the `brew` entries of a Brewfile together with the
//! formulae they depend on, and keeps the "required by" style annotations
//! consistent as packages are added and removed.

mod entry;
mod error;
mod graph;
mod level;
mod line;

pub use entry::{Entry, RestartService};
pub use error::{GraphError, GraphResult};
pub use graph::DependencyGraph;
pub use level::{ByClass, DependencyClass, DependencyLevel};
pub use line::Declaration;
