//! Graph topology
//!
//! Provides the directed edge list consumed by every attention layer and
//! the destination-grouped view used to normalize attention.

mod edge_index;
mod sparse;

pub use edge_index::EdgeIndex;
pub use sparse::IncomingEdges;
