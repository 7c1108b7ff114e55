use super::super::{node::*, tensor_graph::TensorGraph, undead::UndeadPolicy};
use super::{mark_const_producer_nodes, mark_output_reachable_nodes};
use log::debug;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// What happens to constant leaves nobody reads anymore once their producer is gone.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Cascade {
    /// Every constant produced by a removed operation stays in the graph as a leaf.
    /// Two constant producers feeding each other collapse into two leaves.
    KeepLeaves,
    /// Unreachable constant leaves with no consumer left are removed as well.
    /// Two constant producers feeding each other collapse completely.
    Collapse,
}

impl Default for Cascade {
    fn default() -> Self {
        Cascade::KeepLeaves
    }
}

/// Configuration of [eliminate_dead_nodes].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupOptions {
    /// Operator kinds that are never removed, see [UndeadPolicy].
    pub undead_types: Vec<OpType>,
    pub cascade: Cascade,
}

impl CleanupOptions {
    pub fn undead<I: IntoIterator<Item = OpType>>(mut self, types: I) -> Self {
        self.undead_types.extend(types);
        self
    }

    pub fn cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }
}

impl UndeadPolicy for CleanupOptions {
    fn is_undead(&self, ty: &OpType) -> bool {
        self.undead_types.is_undead(ty)
    }
}

/// Summary of a cleanup run.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct CleanupReport {
    pub removed_ops: usize,
    pub removed_data: usize,
    pub old_len: usize,
    pub new_len: usize,
}

impl CleanupReport {
    /// Returns true if the graph was left untouched.
    pub fn is_noop(&self) -> bool {
        self.removed_ops == 0 && self.removed_data == 0
    }
}

impl Display for CleanupReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let reduction = if self.old_len == 0 {
            0.
        } else {
            self.old_len.saturating_sub(self.new_len) as f32 / self.old_len as f32 * 100.
        };
        write!(
            f,
            "old size:{}, new size:{}, reduction: {:.1}%",
            self.old_len, self.new_len, reduction
        )
    }
}

/// Erases operation `idx`, queueing its neighbours since they may have become removable.
fn remove_op(
    g: &mut TensorGraph,
    idx: NodeIndex,
    work: &mut Vec<NodeIndex>,
    report: &mut CleanupReport,
) {
    if let Some(op) = g.erase_node(idx) {
        report.removed_ops += 1;
        work.extend(op.successors.iter().copied());
        work.extend(op.predecessors.iter().copied());
    }
}

/// Returns every node that goes away with the dangling data node `idx`: its consumers, their
/// valueless outputs, the consumers of those and so on.
///
/// Returns [None] if any of them is output reachable or undead, the whole subgraph stays then.
fn dangling_subgraph<U: UndeadPolicy + ?Sized>(
    g: &TensorGraph,
    idx: NodeIndex,
    undead: &U,
) -> Option<Vec<NodeIndex>> {
    let mut subgraph = Vec::new();
    let mut seen = HashSet::new();
    let mut work = vec![idx];
    while let Some(idx) = work.pop() {
        if !seen.insert(idx) {
            continue;
        }
        let node = match g.node(idx) {
            Ok(node) => node,
            Err(_) => continue,
        };
        if node.is_output_reachable != Some(false) {
            return None;
        }
        match node.op_type() {
            Some(ty) if undead.is_undead(ty) => return None,
            // Outputs with a value stay behind as constant leaves.
            Some(_) => work.extend(node.successors.iter().copied().filter(|output| {
                g.node(*output).map_or(false, |output| output.value().is_none())
            })),
            None => work.extend(node.successors.iter().copied()),
        }
        subgraph.push(idx);
    }
    Some(subgraph)
}

/// Removes the operations that no output needs and whose results are already known.
///
/// Both analyses are recomputed first, so the tags of every surviving node are up to date
/// afterwards and running the pass twice is the same as running it once.
///
/// 1. Every operation that is not output reachable, is a constant producer and is not
///    undead is erased. Its outputs stay behind as constant leaves for the operations still
///    reading them.
/// 2. Unreachable data nodes whose producer was taken away by [TensorGraph::erase_node] and
///    that carry no value are erased along with the subgraph consuming them. Valueless outputs
///    of those consumers go the same way. If an undead operation is somewhere in that subgraph
///    nothing of it is removed. Producer-less data nodes that never had a producer are graph
///    inputs and are left alone.
/// 3. With [Cascade::Collapse], unreachable constant leaves without consumers are erased too.
///
/// Output reachable nodes are never removed.
pub fn eliminate_dead_nodes<U: UndeadPolicy + ?Sized>(
    g: &mut TensorGraph,
    options: &CleanupOptions,
    undead: &U,
) -> CleanupReport {
    mark_output_reachable_nodes(g);
    mark_const_producer_nodes(g);

    let mut report = CleanupReport {
        old_len: g.len(),
        ..Default::default()
    };

    let foldable: Vec<NodeIndex> = g
        .nodes
        .iter()
        .filter(|(_, node)| {
            node.is_output_reachable == Some(false)
                && node.is_const_producer() == Some(true)
                && !node.op_type().map_or(false, |ty| undead.is_undead(ty))
        })
        .map(|(idx, _)| NodeIndex::from(idx))
        .collect();
    debug!("Folding {} unreachable constant producers", foldable.len());

    let mut work = Vec::with_capacity(foldable.len());
    for idx in foldable {
        remove_op(g, idx, &mut work, &mut report);
    }

    // Leftovers of earlier erasures.
    work.extend(g.nodes.iter().filter_map(|(idx, node)| {
        if node.is_dangling_data() && node.is_output_reachable == Some(false) {
            Some(NodeIndex::from(idx))
        } else {
            None
        }
    }));

    while let Some(idx) = work.pop() {
        let node = match g.node(idx) {
            Ok(node) => node,
            Err(_) => continue,
        };
        if node.is_output_reachable != Some(false) || !node.predecessors.is_empty() {
            continue;
        }

        if node.is_dangling_data() {
            let subgraph = match dangling_subgraph(g, idx, undead) {
                Some(subgraph) => subgraph,
                None => continue,
            };
            for idx in subgraph {
                if let Some(node) = g.erase_node(idx) {
                    if node.is_op() {
                        report.removed_ops += 1;
                    } else {
                        report.removed_data += 1;
                    }
                    work.extend(node.predecessors.iter().copied());
                    work.extend(node.successors.iter().copied());
                }
            }
        } else if node.is_const_leaf()
            && node.successors.is_empty()
            && options.cascade == Cascade::Collapse
        {
            g.erase_node(idx);
            report.removed_data += 1;
        }
    }

    report.new_len = g.len();
    report
}
