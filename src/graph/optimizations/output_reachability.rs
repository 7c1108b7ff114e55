use super::super::{node::*, tensor_graph::TensorGraph};
use log::{debug, log_enabled, Level};

// Traverses the graph backwards from Result operations and declared outputs,
// marking every node it visits as output reachable and everything else as not.
pub fn mark_output_reachable_nodes(g: &mut TensorGraph) {
    for (_, node) in g.nodes.iter_mut() {
        node.is_output_reachable = Some(false);
    }

    let mut work: Vec<NodeIndex> = g
        .nodes
        .iter()
        .filter(|(_, node)| node.is_output || node.op_type().map_or(false, OpType::is_result))
        .map(|(idx, _)| NodeIndex::from(idx))
        .collect();

    if log_enabled!(Level::Debug) {
        let mut seeds: Vec<_> = work
            .iter()
            .filter_map(|idx| g.node(*idx).ok())
            .map(Node::name)
            .collect();
        seeds.sort_unstable();
        debug!("Output reachability seeded from: {}", seeds.join(", "));
    }

    // The tag doubles as the visited set, cycles stop at the first revisit.
    while let Some(idx) = work.pop() {
        let node = match g.nodes.get_mut(idx.into()) {
            Some(node) => node,
            None => continue,
        };
        if node.is_output_reachable == Some(true) {
            continue;
        }
        node.is_output_reachable = Some(true);
        work.extend(node.predecessors.iter().copied());
    }
}
