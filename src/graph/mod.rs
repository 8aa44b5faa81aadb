// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Frozen network metadata: the topologically sorted node list plus
//! per-node dependency-depth level used to schedule parallel evaluation
//! within a [`crate::snapshot::Snapshot::commit`].
//!
//! Level computation is a single-pass scan in topological order, adapted from
//! the Kahn's-algorithm-with-reverse-dependencies approach used to schedule
//! DAG execution levels in comparable engines: `level(n) = 1 +
//! max(level(dep) for dep in n.deps)`, with input nodes implicitly at level 0.

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::erased::AnyNode;
use crate::node::NodeId;

/// Frozen, shared network shape for one configuration generation.
///
/// All snapshots produced from the same [`crate::builder::Builder::build`]
/// call (and every snapshot derived from them by `change_value`/`commit`)
/// share one `Arc<NetworkMeta>`.
pub struct NetworkMeta {
    /// All nodes, in topological order (inputs and derived nodes mixed).
    pub(crate) nodes: Vec<AnyNode>,
    /// `levels[i]` holds the derived nodes whose level equals `i`. Level 0 is
    /// always empty here — input nodes occupy level 0 implicitly and are not
    /// listed in any level, since levels exist only to schedule *derived*
    /// node recomputation.
    pub(crate) levels: Vec<Vec<NodeId>>,
    /// O(1) reverse lookup from node to its level, used by lazy resolution.
    pub(crate) node_level: HashMap<NodeId, usize>,
    pub(crate) index: HashMap<NodeId, usize>,
    /// Whether each derived node is *effectively* lazy: declared lazy, or
    /// transitively depending on a lazy node. Computed once here so
    /// `commit`/`get_value` never need to re-walk dependencies to answer it.
    pub(crate) effective_lazy: HashMap<NodeId, bool>,
}

impl NetworkMeta {
    /// Build network metadata from a topologically sorted node list.
    ///
    /// `nodes` must already be in dependency order (every node's dependencies
    /// appear earlier in the slice) — [`crate::builder::Builder::build`] is
    /// the only caller and guarantees this via its own topological sort.
    pub(crate) fn from_sorted_nodes(nodes: Vec<AnyNode>) -> Self {
        let mut node_level: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
        let mut levels: Vec<Vec<NodeId>> = Vec::new();
        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
        let mut effective_lazy: HashMap<NodeId, bool> = HashMap::with_capacity(nodes.len());

        for (i, node) in nodes.iter().enumerate() {
            index.insert(node.id().clone(), i);

            let level = match node {
                AnyNode::Input(_) => 0,
                AnyNode::Derived(_) => {
                    let max_dep_level = node
                        .dependencies()
                        .iter()
                        .map(|dep| *node_level.get(dep).unwrap_or(&0))
                        .max()
                        .unwrap_or(0);
                    max_dep_level + 1
                }
            };
            node_level.insert(node.id().clone(), level);

            let lazy = node.declared_lazy()
                || node
                    .dependencies()
                    .iter()
                    .any(|dep| *effective_lazy.get(dep).unwrap_or(&false));
            effective_lazy.insert(node.id().clone(), lazy);

            if let AnyNode::Derived(_) = node {
                if levels.len() <= level {
                    levels.resize_with(level + 1, Vec::new);
                }
                levels[level].push(node.id().clone());
            }
        }

        Self {
            nodes,
            levels,
            node_level,
            index,
            effective_lazy,
        }
    }

    /// True if `id` is declared lazy, or transitively depends on a lazy node.
    pub fn is_lazy(&self, id: &NodeId) -> bool {
        self.effective_lazy.get(id).copied().unwrap_or(false)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().map(|n| n.id())
    }

    pub fn level_of(&self, id: &NodeId) -> Option<usize> {
        self.node_level.get(id).copied()
    }

    pub(crate) fn node(&self, id: &NodeId) -> Option<&AnyNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub(crate) fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }
}

pub(crate) type SharedNetworkMeta = Arc<NetworkMeta>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::erased::{DerivedWrapper, InputWrapper};
    use crate::nodes::{Sum, ValueInput};

    fn input(name: &str) -> AnyNode {
        let id = NodeId::new(name);
        AnyNode::Input(Arc::new(InputWrapper::new(id, ValueInput::<i64>::new())))
    }

    fn sum(name: &str, deps: Vec<NodeId>) -> (AnyNode, NodeId) {
        let id = NodeId::new(name);
        let node = Sum::<i64>::new(deps);
        (
            AnyNode::Derived(Arc::new(DerivedWrapper::new(id.clone(), node))),
            id,
        )
    }

    #[test]
    fn diamond_levels() {
        let a = input("a");
        let a_id = a.id().clone();
        let b = input("b");
        let b_id = b.id().clone();
        let (left, left_id) = sum("left", vec![a_id.clone(), b_id.clone()]);
        let (right, right_id) = sum("right", vec![a_id.clone(), b_id.clone()]);
        let (sink, _sink_id) = sum("sink", vec![left_id.clone(), right_id.clone()]);

        let meta = NetworkMeta::from_sorted_nodes(vec![a, b, left, right, sink]);

        assert_eq!(meta.level_of(&a_id), Some(0));
        assert_eq!(meta.level_of(&b_id), Some(0));
        assert_eq!(meta.level_of(&left_id), Some(1));
        assert_eq!(meta.level_of(&right_id), Some(1));
        assert_eq!(meta.levels[1].len(), 2);
        assert_eq!(meta.levels[2].len(), 1);
    }
}
