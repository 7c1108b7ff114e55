//! Dead and constant node elimination for bipartite tensor dataflow graphs.
//!
//! A [TensorGraph] alternates operation nodes and data nodes. Once constant evaluation has
//! filled in the values it could, [TensorGraph::clean_up] marks what the outputs depend on and
//! which operations only produce constants, then removes the operations that are both unneeded
//! and already folded, leaving their values in place for whoever still reads them.
pub mod data_structures;
pub mod graph;
pub use graph::*;
