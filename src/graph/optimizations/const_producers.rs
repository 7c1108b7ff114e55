use super::super::{node::*, tensor_graph::TensorGraph};
use log::debug;

/// Returns true if the operation `node` is not a graph input and every data node it
/// produces carries a value. Operations with no outputs never qualify.
fn produces_only_constants(g: &TensorGraph, node: &Node) -> bool {
    let op = match node.as_op() {
        Some(op) => op,
        None => return false,
    };
    !op.ty.is_graph_input()
        && !node.successors.is_empty()
        && node.successors.iter().all(|output| {
            g.node(*output)
                .map_or(false, |output| output.value().is_some())
        })
}

// Classifies every operation from its immediate outputs, nothing is propagated.
pub fn mark_const_producer_nodes(g: &mut TensorGraph) {
    let graph: &TensorGraph = g;
    let classified: Vec<(NodeIndex, bool)> = graph
        .nodes
        .iter()
        .filter(|(_, node)| node.is_op())
        .map(|(idx, node)| (NodeIndex::from(idx), produces_only_constants(graph, node)))
        .collect();

    let mut const_producers = 0;
    for (idx, is_const_producer) in classified {
        if let Some(op) = g.nodes.get_mut(idx.into()).and_then(Node::as_op_mut) {
            op.is_const_producer = Some(is_const_producer);
            const_producers += is_const_producer as usize;
        }
    }
    debug!("Found {} constant producers", const_producers);
}
