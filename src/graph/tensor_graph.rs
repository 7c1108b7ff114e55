use super::error::{GraphError, GraphResult};
use super::node::*;
use super::optimizations::*;
use super::value::{ConstValue, Shape};
use crate::data_structures::{Slab, SlabIndex};
use indexmap::IndexMap;
use log::{info, trace};
use std::collections::HashMap;
use std::path::Path;

/// Bipartite dataflow graph of operation nodes and data (tensor) nodes.
///
/// Operations consume and produce data nodes, edges always go from an operation to a data node
/// or from a data node to an operation. A data node has at most one producer, data nodes without
/// one are either constant leaves (they carry a [ConstValue]) or graph inputs.
///
/// Outputs are anchored by [Result](OpType::Result) operations and by nodes marked with
/// [TensorGraph::mark_output]. [TensorGraph::clean_up] removes the operations that no output needs
/// and whose results are already known, keeping their values around for whoever still reads them.
///
/// # Examples
/// A constant branch that nothing needs.
/// ```
/// # use tensorgraph_prune::graph::{TensorGraph, ConstValue, OpType};
/// let mut g = TensorGraph::new();
///
/// let input = g.parameter("input")?;
/// let input_data = g.data("input_data")?;
/// g.connect(input, input_data)?;
///
/// let relu = g.op(OpType::from("Relu"), "relu")?;
/// let relu_data = g.data("relu_data")?;
/// g.connect(input_data, relu)?;
/// g.connect(relu, relu_data)?;
///
/// let output = g.result("output")?;
/// g.connect(relu_data, output)?;
///
/// // Folded by an earlier pass, nobody reads it.
/// let shape_of = g.op(OpType::from("ShapeOf"), "shape_of")?;
/// let shape = g.constant("shape", ConstValue::scalar(4.))?;
/// g.connect(input_data, shape_of)?;
/// g.connect(shape_of, shape)?;
///
/// g.clean_up();
///
/// assert!(g.find("relu").is_some());
/// assert!(g.find("shape_of").is_none());
/// // The value is still there.
/// assert!(g.find("shape").is_some());
/// # Ok::<(), tensorgraph_prune::graph::GraphError>(())
/// ```
///
/// Erasing a node never reconnects its neighbours.
/// ```
/// # use tensorgraph_prune::graph::{TensorGraph, OpType};
/// # let mut g = TensorGraph::new();
/// let a = g.op(OpType::Identity, "a")?;
/// let a_data = g.data("a_data")?;
/// let b = g.op(OpType::Identity, "b")?;
/// g.connect(a, a_data)?;
/// g.connect(a_data, b)?;
///
/// assert!(g.erase_node(a_data).is_some());
/// assert!(g.successors(a)?.is_empty());
/// assert!(g.predecessors(b)?.is_empty());
///
/// // Erasing twice is a no-op.
/// assert!(g.erase_node(a_data).is_none());
/// # Ok::<(), tensorgraph_prune::graph::GraphError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TensorGraph {
    pub(super) nodes: Slab<Node>,
    names: IndexMap<String, NodeIndex>,
    cleanup_options: CleanupOptions,
}

impl TensorGraph {
    /// Returns a new empty [TensorGraph] with default [CleanupOptions].
    pub fn new() -> TensorGraph {
        Default::default()
    }

    /// Returns a new empty [TensorGraph] that will use `options` in [TensorGraph::clean_up].
    pub fn with_cleanup_options(options: CleanupOptions) -> TensorGraph {
        TensorGraph {
            cleanup_options: options,
            ..Default::default()
        }
    }

    fn insert<S: Into<String>>(&mut self, name: S, kind: NodeKind) -> GraphResult<NodeIndex> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        let idx: NodeIndex = self.nodes.insert(Node::new(name.clone(), kind)).into();
        self.names.insert(name, idx);
        Ok(idx)
    }

    /// Returns the [NodeIndex] of a new operation node of type `ty`.
    pub fn op<S: Into<String>>(&mut self, ty: OpType, name: S) -> GraphResult<NodeIndex> {
        self.insert(
            name,
            NodeKind::Op(OpNode {
                ty,
                is_const_producer: None,
            }),
        )
    }

    /// Returns the [NodeIndex] of a new [Parameter](OpType::Parameter) operation.
    pub fn parameter<S: Into<String>>(&mut self, name: S) -> GraphResult<NodeIndex> {
        self.op(OpType::Parameter, name)
    }

    /// Returns the [NodeIndex] of a new [Result](OpType::Result) operation.
    pub fn result<S: Into<String>>(&mut self, name: S) -> GraphResult<NodeIndex> {
        self.op(OpType::Result, name)
    }

    /// Returns the [NodeIndex] of a new data node computed at runtime.
    pub fn data<S: Into<String>>(&mut self, name: S) -> GraphResult<NodeIndex> {
        self.insert(name, NodeKind::Data(DataNode::default()))
    }

    /// Returns the [NodeIndex] of a new data node carrying `value`.
    pub fn constant<S: Into<String>>(
        &mut self,
        name: S,
        value: ConstValue,
    ) -> GraphResult<NodeIndex> {
        let shape = Some(value.shape().clone());
        self.insert(
            name,
            NodeKind::Data(DataNode {
                value: Some(value),
                shape,
                ..Default::default()
            }),
        )
    }

    /// Appends an edge from `from` to `to`.
    ///
    /// The new edge takes the next output port of `from` and the next input port of `to`.
    /// A data node can feed the same operation through several ports.
    pub fn connect(&mut self, from: NodeIndex, to: NodeIndex) -> GraphResult<()> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;
        match (from_node.is_op(), to_node.is_op()) {
            (true, true) => {
                return Err(GraphError::NotBipartite {
                    from,
                    to,
                    kind: "operation",
                })
            }
            (false, false) => {
                return Err(GraphError::NotBipartite {
                    from,
                    to,
                    kind: "data",
                })
            }
            _ => {}
        }
        if from_node.op_type().map_or(false, OpType::is_result) {
            return Err(GraphError::ResultHasOutputs(from));
        }
        if to_node.is_data() {
            if let Some(&producer) = to_node.predecessors.first() {
                return Err(GraphError::MultipleProducers { data: to, producer });
            }
        }

        let from_node = self.node_mut(from)?;
        if !from_node.successors.contains(&to) {
            from_node.successors.push(to);
        }
        let to_node = self.node_mut(to)?;
        to_node.predecessors.push(from);
        if let Some(data) = to_node.as_data_mut() {
            data.lost_producer = false;
        }
        Ok(())
    }

    /// Declares `idx` as an output of the graph, anchoring output reachability.
    pub fn mark_output(&mut self, idx: NodeIndex) -> GraphResult<()> {
        self.node_mut(idx)?.is_output = true;
        Ok(())
    }

    /// Sets the statically known value of data node `idx`.
    ///
    /// Meant for constant evaluation ahead of [TensorGraph::clean_up], the cleanup itself never
    /// changes values. A value, once set, cannot be replaced.
    pub fn set_value(&mut self, idx: NodeIndex, value: ConstValue) -> GraphResult<()> {
        let data = self.data_mut(idx)?;
        if data.value.is_some() {
            return Err(GraphError::ValueAlreadySet(idx));
        }
        data.shape = Some(value.shape().clone());
        data.value = Some(value);
        Ok(())
    }

    /// Sets the shape of data node `idx`.
    pub fn set_shape(&mut self, idx: NodeIndex, shape: Shape) -> GraphResult<()> {
        self.data_mut(idx)?.shape = Some(shape);
        Ok(())
    }

    fn data_mut(&mut self, idx: NodeIndex) -> GraphResult<&mut DataNode> {
        self.node_mut(idx)?
            .as_data_mut()
            .ok_or(GraphError::NotData(idx))
    }

    /// Returns the node at `idx` with all of its attributes.
    pub fn node(&self, idx: NodeIndex) -> GraphResult<&Node> {
        self.nodes
            .get(idx.into())
            .ok_or(GraphError::InvalidReference(idx))
    }

    /// Returns a mutable reference to the node at `idx`.
    pub fn node_mut(&mut self, idx: NodeIndex) -> GraphResult<&mut Node> {
        self.nodes
            .get_mut(idx.into())
            .ok_or(GraphError::InvalidReference(idx))
    }

    /// Returns true if `idx` has not been erased.
    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.nodes.contains(idx.into())
    }

    /// Returns the nodes feeding `idx` in input port order.
    pub fn predecessors(&self, idx: NodeIndex) -> GraphResult<&[NodeIndex]> {
        Ok(self.node(idx)?.predecessors())
    }

    /// Returns the nodes fed by `idx` in output port order.
    pub fn successors(&self, idx: NodeIndex) -> GraphResult<&[NodeIndex]> {
        Ok(self.node(idx)?.successors())
    }

    /// Returns the index of the node called `name`.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).copied()
    }

    /// Returns the indexes of every node in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes.indexes().map(NodeIndex::from)
    }

    /// Returns the nodes which were last marked with `is_output_reachable == reachable`.
    pub fn nodes_with_output_reachable(
        &self,
        reachable: bool,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes
            .iter()
            .filter(move |(_, node)| node.is_output_reachable == Some(reachable))
            .map(|(idx, _)| NodeIndex::from(idx))
    }

    /// Returns the operation nodes which were last marked with `is_const_producer == const_producer`.
    pub fn ops_with_const_producer(
        &self,
        const_producer: bool,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes
            .iter()
            .filter(move |(_, node)| node.is_const_producer() == Some(const_producer))
            .map(|(idx, _)| NodeIndex::from(idx))
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes `idx` and every edge touching it, returning the removed node.
    ///
    /// Neighbours are not reconnected and nothing else is removed, keeping the graph valid is up
    /// to the caller. Data nodes left without a producer are treated as graph inputs from then on,
    /// the next [TensorGraph::clean_up] removes them if no output or undead operation needs them.
    ///
    /// Erasing a node that doesn't exist (or was already erased) is a no-op that returns [None].
    pub fn erase_node(&mut self, idx: NodeIndex) -> Option<Node> {
        let node = self.nodes.remove(idx.into())?;
        for input in node.predecessors.iter() {
            if let Some(input) = self.nodes.get_mut((*input).into()) {
                input.unlink(idx);
            }
        }
        for output in node.successors.iter() {
            if let Some(output) = self.nodes.get_mut((*output).into()) {
                output.unlink(idx);
                if let Some(data) = output.as_data_mut() {
                    data.lost_producer = true;
                }
            }
        }
        self.names.shift_remove(&node.name);
        trace!("erased {}", node.full_name());
        Some(node)
    }

    pub fn cleanup_options(&self) -> &CleanupOptions {
        &self.cleanup_options
    }

    /// Sets the options [TensorGraph::clean_up] runs with.
    pub fn set_cleanup_options(&mut self, options: CleanupOptions) {
        self.cleanup_options = options
    }

    /// Removes every operation that no output depends on and that only produces constants,
    /// using the options set with [TensorGraph::set_cleanup_options].
    ///
    /// See [eliminate_dead_nodes] for the exact rules.
    pub fn clean_up(&mut self) -> CleanupReport {
        let options = self.cleanup_options.clone();
        self.clean_up_with(&options)
    }

    /// Same as [TensorGraph::clean_up] with explicit `options`.
    pub fn clean_up_with(&mut self, options: &CleanupOptions) -> CleanupReport {
        let report = eliminate_dead_nodes(self, options, options);
        info!("Optimization: dead node elimination, {}", report);
        report
    }

    /// Returns the graph in [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language)) format.
    pub fn to_dot(&self) -> String {
        use petgraph::dot::{Config, Dot};
        let mut graph = petgraph::Graph::<_, ()>::new();
        let mut index = HashMap::new();
        for (i, node) in self.nodes.iter() {
            index.insert(i, graph.add_node(node.full_name()));
        }
        for (i, node) in self.nodes.iter() {
            let from = index[&i];
            graph.extend_with_edges(
                node.successors
                    .iter()
                    .filter_map(|successor| index.get(&SlabIndex::from(*successor)))
                    .map(|to| (from, *to)),
            );
        }
        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    /// Dumps the graph in dot format to `path`, to be visualized by many supported tools.
    pub fn dump_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_dot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (TensorGraph, Vec<NodeIndex>) {
        let mut g = TensorGraph::new();
        let p = g.parameter("p").unwrap();
        let p_data = g.data("p_data").unwrap();
        let n = g.op(OpType::Identity, "n").unwrap();
        let n_data = g.data("n_data").unwrap();
        g.connect(p, p_data).unwrap();
        g.connect(p_data, n).unwrap();
        g.connect(n, n_data).unwrap();
        (g, vec![p, p_data, n, n_data])
    }

    #[test]
    fn test_nodes_in_insertion_order() {
        let (g, ids) = chain();
        assert_eq!(g.nodes().collect::<Vec<_>>(), ids);
        assert_eq!(g.len(), 4);
        assert_eq!(g.find("n"), Some(ids[2]));
        assert_eq!(g.find("missing"), None);
    }

    #[test]
    fn test_ports_keep_order_and_duplicates() {
        let mut g = TensorGraph::new();
        let a = g.data("a").unwrap();
        let b = g.data("b").unwrap();
        let mul = g.op(OpType::from("Mul"), "mul").unwrap();
        g.connect(b, mul).unwrap();
        g.connect(a, mul).unwrap();
        g.connect(a, mul).unwrap();

        assert_eq!(g.predecessors(mul).unwrap(), &[b, a, a]);
        assert_eq!(g.successors(a).unwrap(), &[mul]);

        g.erase_node(a);
        assert_eq!(g.predecessors(mul).unwrap(), &[b]);
    }

    #[test]
    fn test_structural_errors() {
        let (mut g, ids) = chain();
        let other = g.op(OpType::Identity, "other").unwrap();
        let out = g.result("out").unwrap();
        let out_data = g.data("out_data").unwrap();

        assert_eq!(
            g.connect(ids[0], other),
            Err(GraphError::NotBipartite {
                from: ids[0],
                to: other,
                kind: "operation"
            })
        );
        assert_eq!(
            g.connect(ids[1], ids[3]),
            Err(GraphError::NotBipartite {
                from: ids[1],
                to: ids[3],
                kind: "data"
            })
        );
        assert_eq!(
            g.connect(other, ids[3]),
            Err(GraphError::MultipleProducers {
                data: ids[3],
                producer: ids[2]
            })
        );
        assert_eq!(
            g.connect(out, out_data),
            Err(GraphError::ResultHasOutputs(out))
        );
        assert_eq!(
            g.data("p").unwrap_err(),
            GraphError::DuplicateName("p".into())
        );
        assert_eq!(
            g.set_value(ids[0], ConstValue::scalar(0.)),
            Err(GraphError::NotData(ids[0]))
        );
        g.set_value(ids[3], ConstValue::scalar(0.)).unwrap();
        assert_eq!(
            g.set_value(ids[3], ConstValue::scalar(1.)),
            Err(GraphError::ValueAlreadySet(ids[3]))
        );
        assert_eq!(g.node(ids[3]).unwrap().value(), Some(&ConstValue::scalar(0.)));

        g.erase_node(other);
        assert_eq!(g.node(other), Err(GraphError::InvalidReference(other)));
        assert_eq!(
            g.connect(other, out_data),
            Err(GraphError::InvalidReference(other))
        );
        assert!(g.successors(other).is_err());
        assert!(g.mark_output(other).is_err());
    }

    #[test]
    fn test_erase_node_drops_edges_and_name() {
        let (mut g, ids) = chain();
        let erased = g.erase_node(ids[2]).unwrap();
        assert_eq!(erased.name(), "n");
        assert_eq!(erased.predecessors(), &[ids[1]]);

        assert!(!g.contains(ids[2]));
        assert!(g.successors(ids[1]).unwrap().is_empty());
        assert!(g.predecessors(ids[3]).unwrap().is_empty());
        let lost = |g: &TensorGraph, idx| g.node(idx).unwrap().as_data().unwrap().lost_producer();
        assert!(lost(&g, ids[3]));
        // Losing a consumer does not count.
        assert!(!lost(&g, ids[1]));
        assert_eq!(g.find("n"), None);
        assert!(g.erase_node(ids[2]).is_none());

        // The name can be taken again, the index is new.
        let n = g.op(OpType::Identity, "n").unwrap();
        assert_ne!(n, ids[2]);
        g.connect(n, ids[3]).unwrap();
        assert!(!lost(&g, ids[3]));
    }

    #[test]
    fn test_set_value_and_shape() {
        let (mut g, ids) = chain();
        let value = ConstValue::new(Shape::from_slice(&[2]), vec![1., 2.]).unwrap();
        g.set_value(ids[3], value.clone()).unwrap();

        let node = g.node(ids[3]).unwrap();
        assert_eq!(node.value(), Some(&value));
        assert_eq!(
            node.as_data().unwrap().shape.as_deref(),
            Some(&[2usize][..])
        );

        g.set_shape(ids[1], Shape::from_slice(&[1, 3])).unwrap();
        let p_data = g.node(ids[1]).unwrap().as_data().unwrap();
        assert!(!p_data.is_const());
        assert_eq!(p_data.shape.as_deref(), Some(&[1usize, 3][..]));
    }

    #[test]
    fn test_dot_lists_every_node() {
        let (mut g, ids) = chain();
        g.mark_output(ids[3]).unwrap();
        let dot = g.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("Parameter:p"));
        assert!(dot.contains("Identity:n"));
        assert!(dot.contains("OUT:Data:n_data"));
        assert_eq!(dot.matches("->").count(), 3);
    }
}
