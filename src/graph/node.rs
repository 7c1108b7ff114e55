use super::value::{ConstValue, Shape};
use crate::data_structures::SlabIndex;

use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};

/// Represents the index of a node in a [super::TensorGraph].
///
/// Indexes are never reused, an index of an erased node stays dangling forever.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct NodeIndex {
    pub(super) idx: usize,
}

/// Returns a new NodeIndex from a provided usize.
macro_rules! ni {
    ( $x:expr ) => {{
        NodeIndex::new($x)
    }};
}

impl NodeIndex {
    /// Returns a new NodeIndex from a provided usize.
    pub(super) const fn new(idx: usize) -> NodeIndex {
        NodeIndex { idx }
    }
}

impl From<SlabIndex> for NodeIndex {
    fn from(i: SlabIndex) -> Self {
        ni!(i.position())
    }
}
impl From<NodeIndex> for SlabIndex {
    fn from(i: NodeIndex) -> Self {
        SlabIndex::from_position(i.idx)
    }
}
impl Display for NodeIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.idx)
    }
}

/// Operator kind of an operation node.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum OpType {
    /// Graph input, its outputs are fed at runtime.
    Parameter,
    /// Graph output sink, it has no outputs of its own.
    Result,
    Const,
    Identity,
    /// Any other operator kind, opaque to the pass.
    Custom(String),
}
use OpType::*;
impl OpType {
    /// Returns true if nodes of this kind feed the graph from the outside.
    ///
    /// Graph inputs are never constant producers, whatever their outputs carry.
    pub fn is_graph_input(&self) -> bool {
        matches!(self, Parameter)
    }

    /// Returns true if `self` is [Result].
    pub fn is_result(&self) -> bool {
        matches!(self, Result)
    }
}
impl From<&str> for OpType {
    fn from(s: &str) -> Self {
        match s {
            "Parameter" => Parameter,
            "Result" => Result,
            "Const" => Const,
            "Identity" => Identity,
            other => Custom(other.into()),
        }
    }
}
impl Display for OpType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Parameter => write!(f, stringify!(Parameter)),
            Result => write!(f, stringify!(Result)),
            Const => write!(f, stringify!(Const)),
            Identity => write!(f, stringify!(Identity)),
            Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Amount of edges kept in the stack for each direction of a node.
/// If a node has more than NODE_EDGES_TINYVEC_SIZE edges, they will spill into the heap.
pub(super) const NODE_EDGES_TINYVEC_SIZE: usize = 2;

pub(super) type Edges = SmallVec<[NodeIndex; NODE_EDGES_TINYVEC_SIZE]>;

/// Attributes only operation nodes have.
#[derive(Debug, Clone, PartialEq)]
pub struct OpNode {
    pub ty: OpType,
    /// [None] until [mark_const_producer_nodes](super::mark_const_producer_nodes) runs.
    pub is_const_producer: Option<bool>,
}

/// Attributes only data nodes have.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataNode {
    pub(super) value: Option<ConstValue>,
    pub shape: Option<Shape>,
    pub(super) lost_producer: bool,
}
impl DataNode {
    /// Returns the statically known value of the tensor, if any.
    pub fn value(&self) -> Option<&ConstValue> {
        self.value.as_ref()
    }

    /// Returns true if the tensor is statically known.
    pub fn is_const(&self) -> bool {
        self.value.is_some()
    }

    /// Returns true if the producer of this tensor was erased and nothing replaced it.
    pub fn lost_producer(&self) -> bool {
        self.lost_producer
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Op(OpNode),
    Data(DataNode),
}

/// Vertex of a [super::TensorGraph] with its edges and attributes.
///
/// Predecessors are kept in input port order, successors in output port order.
/// For data nodes the only predecessor is the producer and the successors are the consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(super) name: String,
    pub(super) kind: NodeKind,
    pub(super) predecessors: Edges,
    pub(super) successors: Edges,
    pub is_output: bool,
    /// [None] until [mark_output_reachable_nodes](super::mark_output_reachable_nodes) runs.
    pub is_output_reachable: Option<bool>,
}

impl Node {
    pub(super) fn new(name: String, kind: NodeKind) -> Self {
        Node {
            name,
            kind,
            predecessors: Default::default(),
            successors: Default::default(),
            is_output: false,
            is_output_reachable: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn predecessors(&self) -> &[NodeIndex] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[NodeIndex] {
        &self.successors
    }

    pub fn is_op(&self) -> bool {
        matches!(self.kind, NodeKind::Op(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self.kind, NodeKind::Data(_))
    }

    pub fn as_op(&self) -> Option<&OpNode> {
        match &self.kind {
            NodeKind::Op(op) => Some(op),
            NodeKind::Data(_) => None,
        }
    }

    pub fn as_op_mut(&mut self) -> Option<&mut OpNode> {
        match &mut self.kind {
            NodeKind::Op(op) => Some(op),
            NodeKind::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataNode> {
        match &self.kind {
            NodeKind::Data(data) => Some(data),
            NodeKind::Op(_) => None,
        }
    }

    pub fn as_data_mut(&mut self) -> Option<&mut DataNode> {
        match &mut self.kind {
            NodeKind::Data(data) => Some(data),
            NodeKind::Op(_) => None,
        }
    }

    /// Returns the operator kind, [None] for data nodes.
    pub fn op_type(&self) -> Option<&OpType> {
        self.as_op().map(|op| &op.ty)
    }

    /// Returns the constant producer tag, [None] for data nodes and before classification.
    pub fn is_const_producer(&self) -> Option<bool> {
        self.as_op().and_then(|op| op.is_const_producer)
    }

    /// Returns the value of a data node, [None] for operation nodes and runtime tensors.
    pub fn value(&self) -> Option<&ConstValue> {
        self.as_data().and_then(DataNode::value)
    }

    /// Returns true if `self` is a data node whose producer was erased, leaving it without a value.
    ///
    /// Such a node is a graph input by convention, until a cleanup finds nothing needs it.
    pub(super) fn is_dangling_data(&self) -> bool {
        self.as_data().map_or(false, |data| {
            data.lost_producer && data.value.is_none() && self.predecessors.is_empty()
        })
    }

    /// Returns true if `self` is a data node with a value and no producer.
    pub(super) fn is_const_leaf(&self) -> bool {
        self.is_data() && self.predecessors.is_empty() && self.value().is_some()
    }

    /// Removes every occurrence of `idx` from both edge lists.
    pub(super) fn unlink(&mut self, idx: NodeIndex) {
        self.predecessors.retain(|p| *p != idx);
        self.successors.retain(|s| *s != idx);
    }

    /// "OUT:?KIND:NAME", OUT: is only present for declared outputs.
    pub(super) fn full_name(&self) -> String {
        let out = if self.is_output { "OUT:" } else { "" };
        match &self.kind {
            NodeKind::Op(op) => format!("{}{}:{}", out, op.ty, self.name),
            NodeKind::Data(data) => match &data.value {
                Some(value) => format!("{}Data({}):{}", out, value, self.name),
                None => format!("{}Data:{}", out, self.name),
            },
        }
    }
}
