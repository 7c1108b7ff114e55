mod const_producers;
mod dead_node_elimination;
mod output_reachability;
pub use const_producers::*;
pub use dead_node_elimination::*;
pub use output_reachability::*;
