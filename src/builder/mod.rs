// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Assembles a fixed set of nodes into a [`crate::graph::NetworkMeta`] and
//! the first consistent [`Snapshot`], validating the shape once up front so
//! `commit` never has to.
//!
//! Cycle detection is a depth-first walk over three node colors (unvisited,
//! in-progress, done), adapted from the white/gray/black traversal the
//! teacher uses to validate a pipeline's stage graph before it is allowed to
//! run.

use std::collections::HashMap;
use std::sync::Arc;

use im::HashSet as ImHashSet;

use crate::errors::GraphError;
use crate::graph::NetworkMeta;
use crate::node::erased::{AnyNode, DerivedWrapper, InputWrapper};
use crate::node::value::{erase, ErasedValue};
use crate::node::{DerivedNode, InputNode, NodeHandle, NodeId};
use crate::observability::messages::builder::{
    CircularDependencyDetected, GraphBuilt, MissingDependencyDetected, NodesRemoved,
};
use crate::observability::messages::StructuredLog;
use crate::snapshot::lazy::lazy_unresolved;
use crate::snapshot::{Snapshot, ValueMap};

/// Incrementally assembles a node set, then validates and freezes it into a
/// [`Snapshot`] via [`Builder::build`].
///
/// A `Builder` is single-use: nodes are only ever added, never removed or
/// replaced, in keeping with a graph's shape being immutable once committed.
/// To evolve an existing graph's shape, start a new `Builder` with
/// [`Builder::from_snapshot`].
pub struct Builder {
    nodes: Vec<AnyNode>,
    initial_values: HashMap<NodeId, ErasedValue>,
    removed: ImHashSet<NodeId>,
}

enum Color {
    Unvisited,
    InProgress,
    Done,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            initial_values: HashMap::new(),
            removed: ImHashSet::new(),
        }
    }

    /// Seed a new builder from an existing snapshot's node set, so callers
    /// can add or remove nodes without re-declaring the whole graph.
    /// Existing nodes keep their identity and current value.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut initial_values = HashMap::new();
        let dump = snapshot.dump();
        for id in snapshot.nodes() {
            if let Some(value) = dump.get(id.name()) {
                initial_values.insert(id.clone(), value.clone());
            }
        }
        Self {
            nodes: snapshot.node_list(),
            initial_values,
            removed: ImHashSet::new(),
        }
    }

    pub fn add_input<N: InputNode>(
        &mut self,
        name: impl Into<Arc<str>>,
        node: N,
        initial: N::Value,
    ) -> Result<NodeHandle<N::Value>, GraphError> {
        let id = NodeId::new(name);
        let validated = node
            .validate(initial)
            .map_err(|reason| GraphError::InvalidInputValue {
                node: id.to_string(),
                reason,
            })?;
        self.initial_values.insert(id.clone(), erase(validated));
        self.nodes
            .push(AnyNode::Input(Arc::new(InputWrapper::new(id.clone(), node))));
        Ok(NodeHandle::new(id))
    }

    pub fn add_calculation<N: DerivedNode>(
        &mut self,
        name: impl Into<Arc<str>>,
        node: N,
    ) -> Result<NodeHandle<N::Value>, GraphError> {
        let id = NodeId::new(name);
        self.nodes
            .push(AnyNode::Derived(Arc::new(DerivedWrapper::new(id.clone(), node))));
        Ok(NodeHandle::new(id))
    }

    /// Register a node already wrapped as [`AnyNode`], for callers (the
    /// config loader's calculation registry) that build derived nodes behind
    /// a type-erased constructor rather than a concrete `N: DerivedNode`.
    pub(crate) fn add_any_node(&mut self, node: AnyNode) {
        self.nodes.push(node);
    }

    /// Remove a node and every node that transitively depends on it. Nodes
    /// already removed, or never present, are silently ignored — matching
    /// `HashMap::remove`'s idempotence rather than erroring on a no-op.
    pub fn remove_node_and_dependents(&mut self, id: &NodeId) {
        let mut to_remove: ImHashSet<NodeId> = ImHashSet::unit(id.clone());
        // The node list isn't sorted yet, so a fixed-point pass over
        // dependents is simplest: repeat until nothing new is marked.
        loop {
            let mut grew = false;
            for node in &self.nodes {
                if to_remove.contains(node.id()) {
                    continue;
                }
                if node.dependencies().iter().any(|d| to_remove.contains(d)) {
                    to_remove.insert(node.id().clone());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        for id in &to_remove {
            self.removed.insert(id.clone());
        }
        self.nodes.retain(|n| !to_remove.contains(n.id()));
        self.initial_values.retain(|k, _| !to_remove.contains(k));
        NodesRemoved {
            removed_count: to_remove.len(),
        }
        .log();
    }

    /// Validate the node set (no cycles, every dependency registered),
    /// topologically sort it, and evaluate every derived node once to
    /// produce the first consistent [`Snapshot`].
    pub fn build(self) -> Result<Snapshot, GraphError> {
        let sorted = self.topological_sort()?;
        for node in &sorted {
            node.validate_ready()?;
        }
        let meta = Arc::new(NetworkMeta::from_sorted_nodes(sorted));

        let mut values = ValueMap::new();
        for node in &meta.nodes {
            let value = match node {
                AnyNode::Input(_) => self
                    .initial_values
                    .get(node.id())
                    .cloned()
                    .expect("input node missing its initial value: internal invariant violated"),
                AnyNode::Derived(derived) => {
                    if node.declared_lazy() {
                        lazy_unresolved()
                    } else {
                        let inputs: Vec<ErasedValue> = derived
                            .dependencies()
                            .iter()
                            .map(|dep| {
                                values
                                    .get(dep)
                                    .cloned()
                                    .expect("dependency evaluated earlier in topological order")
                            })
                            .collect();
                        derived.calculate(&inputs)
                    }
                }
            };
            values.insert(node.id().clone(), value);
        }

        GraphBuilt {
            node_count: meta.nodes.len(),
            level_count: meta.levels.len(),
        }
        .log();

        Ok(Snapshot::new(meta, values))
    }

    /// Convenience wrapper matching [`Snapshot::commit`]'s return shape: the
    /// fresh snapshot plus the set of nodes considered changed (every node,
    /// since this is the graph's first generation).
    pub fn build_and_commit(self) -> Result<(Snapshot, ImHashSet<NodeId>), GraphError> {
        let snapshot = self.build()?;
        let changed = snapshot.nodes().cloned().collect();
        Ok((snapshot, changed))
    }

    fn topological_sort(&self) -> Result<Vec<AnyNode>, GraphError> {
        let index: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id().clone(), i))
            .collect();

        for node in &self.nodes {
            for dep in node.dependencies() {
                if !index.contains_key(dep) {
                    MissingDependencyDetected {
                        processor_id: &node.id().to_string(),
                        missing_dependency: &dep.to_string(),
                    }
                    .log();
                    return Err(GraphError::MissingDependency {
                        processor_id: node.id().to_string(),
                        missing_dependency: dep.to_string(),
                    });
                }
            }
        }

        let mut colors: HashMap<NodeId, Color> =
            self.nodes.iter().map(|n| (n.id().clone(), Color::Unvisited)).collect();
        let mut sorted = Vec::with_capacity(self.nodes.len());
        let mut stack_path: Vec<String> = Vec::new();

        for node in &self.nodes {
            self.visit(node.id(), &index, &mut colors, &mut sorted, &mut stack_path)?;
        }

        Ok(sorted)
    }

    fn visit(
        &self,
        id: &NodeId,
        index: &HashMap<NodeId, usize>,
        colors: &mut HashMap<NodeId, Color>,
        sorted: &mut Vec<AnyNode>,
        stack_path: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        match colors.get(id) {
            Some(Color::Done) => return Ok(()),
            Some(Color::InProgress) => {
                stack_path.push(id.to_string());
                CircularDependencyDetected {
                    path: &stack_path,
                }
                .log();
                return Err(GraphError::CircularDependency(stack_path.clone()));
            }
            _ => {}
        }

        colors.insert(id.clone(), Color::InProgress);
        stack_path.push(id.to_string());

        let node = &self.nodes[index[id]];
        for dep in node.dependencies().to_vec() {
            self.visit(&dep, index, colors, sorted, stack_path)?;
        }

        stack_path.pop();
        colors.insert(id.clone(), Color::Done);
        sorted.push(node.clone());
        Ok(())
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Sum, ValueInput};

    #[test]
    fn detects_missing_dependency() {
        let mut builder = Builder::new();
        let ghost = NodeId::new("ghost");
        builder
            .add_calculation("sum", Sum::<i64>::new(vec![ghost]))
            .unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(err, GraphError::MissingDependency { .. }));
    }

    #[test]
    fn detects_cycle() {
        // Dependencies normally only ever point at already-registered node
        // ids, so a genuine cycle can't arise through `add_calculation`
        // alone; construct one directly to exercise `topological_sort`.
        let mut builder = Builder::new();
        let a_id = NodeId::new("a");
        let b_id = NodeId::new("b");
        builder.nodes.push(AnyNode::Derived(Arc::new(DerivedWrapper::new(
            a_id.clone(),
            Sum::<i64>::new(vec![b_id.clone()]),
        ))));
        builder.nodes.push(AnyNode::Derived(Arc::new(DerivedWrapper::new(
            b_id.clone(),
            Sum::<i64>::new(vec![a_id.clone()]),
        ))));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, GraphError::CircularDependency(_)));
    }

    #[test]
    fn build_fails_on_unbound_placeholder() {
        use crate::node::Placeholder;

        let mut builder = Builder::new();
        let placeholder: Placeholder<Sum<i64>> = Placeholder::new();
        builder.add_any_node(AnyNode::Derived(Arc::new(DerivedWrapper::new(
            NodeId::new("p"),
            placeholder,
        ))));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperation { .. }));
    }

    #[test]
    fn remove_node_and_dependents_cascades() {
        let mut builder = Builder::new();
        let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
        let sum = builder
            .add_calculation("sum", Sum::<i64>::new(vec![a.id().clone()]))
            .unwrap();
        let total = builder
            .add_calculation("total", Sum::<i64>::new(vec![sum.id().clone()]))
            .unwrap();

        builder.remove_node_and_dependents(sum.id());

        let snapshot = builder.build().unwrap();
        assert!(snapshot.nodes().any(|id| id == a.id()));
        assert!(!snapshot.nodes().any(|id| id == sum.id()));
        assert!(!snapshot.nodes().any(|id| id == total.id()));
    }
}
