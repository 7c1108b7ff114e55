use super::OpType;
use std::collections::HashSet;

/// Decides which operator kinds survive [clean up](super::TensorGraph::clean_up) no matter what.
///
/// Undead nodes usually have side effects or are required by whoever consumes the graph,
/// folding them away would change the program even if all of their inputs are constant.
pub trait UndeadPolicy {
    fn is_undead(&self, ty: &OpType) -> bool;
}

impl UndeadPolicy for [OpType] {
    fn is_undead(&self, ty: &OpType) -> bool {
        self.contains(ty)
    }
}

impl UndeadPolicy for Vec<OpType> {
    fn is_undead(&self, ty: &OpType) -> bool {
        self.as_slice().is_undead(ty)
    }
}

impl UndeadPolicy for HashSet<OpType> {
    fn is_undead(&self, ty: &OpType) -> bool {
        self.contains(ty)
    }
}

impl<F: Fn(&OpType) -> bool> UndeadPolicy for F {
    fn is_undead(&self, ty: &OpType) -> bool {
        self(ty)
    }
}
