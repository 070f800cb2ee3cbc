/// Cycle tracking and memoized trunks for one top-level resolve.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::schema::node::{DialogueNode, NodeId};

/// State scoped to one top-level `resolve` call.
///
/// `seen` detects cycles; `memo` short-circuits a start node that is
/// resolved again with the same cache.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    seen: FxHashSet<NodeId>,
    memo: FxHashMap<NodeId, Vec<DialogueNode>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_visited(&self, id: NodeId) -> bool {
        self.seen.contains(&id)
    }

    pub fn mark_visited(&mut self, id: NodeId) {
        self.seen.insert(id);
    }

    pub fn visited_count(&self) -> usize {
        self.seen.len()
    }

    pub fn memoized(&self, start: NodeId) -> Option<&[DialogueNode]> {
        self.memo.get(&start).map(|trunk| trunk.as_slice())
    }

    pub fn memoize(&mut self, start: NodeId, trunk: Vec<DialogueNode>) {
        self.memo.insert(start, trunk);
    }

    /// Snapshot of `seen` with a fresh, empty `memo`, for resolving one
    /// alternative of a branch point.
    pub fn fork(&self) -> Self {
        Self {
            seen: self.seen.clone(),
            memo: FxHashMap::default(),
        }
    }
}
