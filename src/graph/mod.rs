#[macro_use]
mod node;
mod error;
mod optimizations;
mod tensor_graph;
mod undead;
mod value;
pub use error::*;
pub use node::*;
pub use optimizations::*;
pub use tensor_graph::*;
pub use undead::*;
pub use value::*;
