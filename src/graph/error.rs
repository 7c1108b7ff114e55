use super::NodeIndex;
use thiserror::Error;

/// Structural integrity violations detected while building or querying a [TensorGraph](super::TensorGraph).
///
/// These always point at a bug in whatever built the graph, nothing in this crate recovers from them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    InvalidReference(NodeIndex),
    #[error("edge {from} -> {to} connects two {kind} nodes")]
    NotBipartite {
        from: NodeIndex,
        to: NodeIndex,
        kind: &'static str,
    },
    #[error("data node {data} is already produced by {producer}")]
    MultipleProducers { data: NodeIndex, producer: NodeIndex },
    #[error("result node {0} cannot have outputs")]
    ResultHasOutputs(NodeIndex),
    #[error("a node named {0:?} already exists")]
    DuplicateName(String),
    #[error("node {0} is not a data node")]
    NotData(NodeIndex),
    #[error("data node {0} already carries a value")]
    ValueAlreadySet(NodeIndex),
}

pub type GraphResult<T> = Result<T, GraphError>;
