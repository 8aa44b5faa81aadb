// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Immutable (from the outside) snapshots of a graph's values, and the
//! `commit` algorithm that derives one snapshot from another.
//!
//! A `Snapshot` shares its [`crate::graph::NetworkMeta`] with every snapshot
//! derived from it — `commit` never rebuilds the shape, only recomputes
//! values — mirroring the teacher's separation between a pipeline's static
//! configuration and its per-run `ExecutionContext`.

mod commit;
pub(crate) mod lazy;
#[cfg(test)]
mod integration_tests;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use im::HashSet as ImHashSet;
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::errors::GraphError;
use crate::graph::SharedNetworkMeta;
use crate::node::value::{downcast, erase, ErasedValue};
use crate::node::{NodeHandle, NodeId};
use crate::observability::messages::snapshot::{
    CommitCancelled, CommitCompleted, CommitStarted, LazyResolutionCompleted,
};
use crate::observability::messages::StructuredLog;
use commit::{process_node, NodeOutcome};
use lazy::{is_lazy_unresolved, lazy_unresolved};

pub(crate) type ValueMap = im::HashMap<NodeId, ErasedValue>;

static NEXT_VERSION_ID: AtomicU64 = AtomicU64::new(1);

/// Options controlling one [`Snapshot::commit_with`] call.
#[derive(Default, Clone)]
pub struct CommitOptions {
    /// Token checked between levels; if cancelled, nodes in the remaining
    /// levels are left `Unprocessed` rather than recomputed.
    pub cancellation: Option<CancellationToken>,
    /// Evaluate nodes within the same level concurrently via
    /// `tokio::task::JoinSet` rather than sequentially. Requires a running
    /// Tokio runtime; `commit` (no `_with`) always runs sequentially.
    pub parallel: bool,
}

/// A consistent view of every node's current value.
///
/// Cloning a `Snapshot` is O(1) (the value map is structurally shared via
/// `im::HashMap`); mutating one snapshot's inputs via `change_value` never
/// affects another snapshot cloned from the same ancestor.
#[derive(Clone)]
pub struct Snapshot {
    meta: SharedNetworkMeta,
    values: Arc<RwLock<ValueMap>>,
    initial_values: ValueMap,
    changes: ImHashSet<NodeId>,
    version_id: u64,
    lazy_guard: Arc<Mutex<()>>,
}

impl Snapshot {
    pub(crate) fn new(meta: SharedNetworkMeta, values: ValueMap) -> Self {
        for node in &meta.nodes {
            node.on_build();
        }
        Self {
            meta,
            initial_values: values.clone(),
            values: Arc::new(RwLock::new(values)),
            changes: ImHashSet::new(),
            version_id: NEXT_VERSION_ID.fetch_add(1, Ordering::Relaxed),
            lazy_guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn version_id(&self) -> u64 {
        self.version_id
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.meta.node_ids()
    }

    /// The underlying node list, in topological order — used by
    /// [`crate::builder::Builder::from_snapshot`] to seed a new builder from
    /// an existing graph's shape.
    pub(crate) fn node_list(&self) -> Vec<crate::node::erased::AnyNode> {
        self.meta.nodes.clone()
    }

    /// Replace an input node's value, validating it through the node's own
    /// `InputNode::validate`. Marks the node changed for the next `commit`.
    pub fn change_value<T: Clone + Send + Sync + 'static>(
        &mut self,
        handle: &NodeHandle<T>,
        value: T,
    ) -> Result<(), GraphError> {
        self.change_object_value(handle.id(), erase(value))
    }

    /// Type-erased counterpart of [`Snapshot::change_value`], for callers
    /// that only hold a [`NodeId`] (the façade's configuration-driven paths).
    pub fn change_object_value(
        &mut self,
        id: &NodeId,
        value: ErasedValue,
    ) -> Result<(), GraphError> {
        let node = self
            .meta
            .node(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        let input = node
            .as_input()
            .ok_or_else(|| GraphError::InvalidOperation {
                reason: format!("'{id}' is a derived node, not an input"),
            })?;
        let validated = input.validate(value)?;

        let changed = {
            let values = self.values.read();
            match values.get(id) {
                Some(previous) => !input.are_values_equal(previous, &validated),
                None => true,
            }
        };

        if changed {
            // Clones of this snapshot (branches taken before this mutation)
            // share this `Arc<RwLock<ValueMap>>` — writing through it in
            // place would leak this change into every sibling branch. Swap
            // in a fresh `Arc` instead; `im::HashMap::clone` is O(1)
            // structural sharing, so this costs nothing but the new pointer.
            let mut updated = self.values.read().clone();
            updated.insert(id.clone(), validated);
            self.values = Arc::new(RwLock::new(updated));
            self.changes.insert(id.clone());
        }
        Ok(())
    }

    /// Force a node to be treated as changed on the next `commit`, without
    /// altering its stored value — used by the façade's `change_configuration`
    /// path when a derived node's *behavior* changes but its dependencies do
    /// not.
    pub fn mark_changed(&mut self, id: &NodeId) -> Result<(), GraphError> {
        if !self.meta.contains(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }
        self.changes.insert(id.clone());
        Ok(())
    }

    /// Read a node's current value, resolving it first if it is lazy and
    /// still pending from the last `commit`.
    pub fn get_value<T: Clone + Send + Sync + 'static>(
        &self,
        handle: &NodeHandle<T>,
    ) -> Result<T, GraphError> {
        let erased = self.get_value_erased(handle.id())?;
        Ok(downcast::<T>(&erased).clone())
    }

    /// Async counterpart of [`Snapshot::get_value`]. Lazy resolution runs
    /// synchronously under the hood; this just keeps the potentially
    /// blocking work off the caller's async task via `spawn_blocking`.
    pub async fn get_value_async<T: Clone + Send + Sync + 'static>(
        &self,
        handle: &NodeHandle<T>,
    ) -> Result<T, GraphError> {
        let snapshot = self.clone();
        let id = handle.id().clone();
        let erased = tokio::task::spawn_blocking(move || snapshot.get_value_erased(&id))
            .await
            .map_err(|e| GraphError::InvalidOperation {
                reason: format!("get_value_async task panicked: {e}"),
            })??;
        Ok(downcast::<T>(&erased).clone())
    }

    pub(crate) fn get_value_erased(&self, id: &NodeId) -> Result<ErasedValue, GraphError> {
        if !self.meta.contains(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }

        let fast = self.values.read().get(id).cloned();
        if let Some(value) = &fast {
            if !is_lazy_unresolved(value) {
                return Ok(value.clone());
            }
        }

        // Slow path: resolve this node and every lazy-unresolved dependency
        // it transitively needs, one reader at a time.
        let _guard = self.lazy_guard.lock();
        let current = self.values.read().get(id).cloned();
        if let Some(value) = &current {
            if !is_lazy_unresolved(value) {
                return Ok(value.clone());
            }
        }

        let pending = self.collect_pending(id);
        let mut computed: HashMap<NodeId, ErasedValue> = HashMap::new();
        let mut by_level: Vec<(usize, NodeId)> = pending
            .into_iter()
            .map(|n| (self.meta.level_of(&n).unwrap_or(0), n))
            .collect();
        by_level.sort_by_key(|(level, _)| *level);

        let snapshot = self.values.read().clone();
        for (_, node_id) in by_level {
            let node = self
                .meta
                .node(&node_id)
                .expect("pending node must exist in network meta");
            let derived = node
                .as_derived()
                .expect("only derived nodes can be lazy-unresolved");
            let inputs: Vec<ErasedValue> = derived
                .dependencies()
                .iter()
                .map(|dep| {
                    computed
                        .get(dep)
                        .cloned()
                        .or_else(|| snapshot.get(dep).cloned())
                        .expect("dependency missing a value during lazy resolution")
                })
                .collect();
            let value = derived.calculate(&inputs);
            computed.insert(node_id, value);
        }

        let mut values = self.values.write();
        for (node_id, value) in &computed {
            values.insert(node_id.clone(), value.clone());
        }
        drop(values);

        LazyResolutionCompleted {
            resolved_count: computed.len(),
        }
        .log();

        computed
            .get(id)
            .cloned()
            .or_else(|| self.values.read().get(id).cloned())
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    /// Depth-first walk collecting every lazy-unresolved ancestor of `id`
    /// (including `id` itself, if unresolved), innermost-first ordering is
    /// irrelevant since the caller re-sorts by level.
    fn collect_pending(&self, id: &NodeId) -> Vec<NodeId> {
        let mut pending = Vec::new();
        let mut stack = vec![id.clone()];
        let mut seen = std::collections::HashSet::new();
        let values = self.values.read();

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let is_unresolved = values
                .get(&current)
                .map(|v| is_lazy_unresolved(v))
                .unwrap_or(true);
            if !is_unresolved {
                continue;
            }
            pending.push(current.clone());
            if let Some(node) = self.meta.node(&current) {
                for dep in node.dependencies() {
                    stack.push(dep.clone());
                }
            }
        }
        pending
    }

    /// Recompute every derived node reachable from a changed input or a node
    /// previously marked changed, returning the new snapshot and the set of
    /// nodes whose values actually changed. Sequential, uncancellable.
    pub fn commit(&self) -> (Snapshot, ImHashSet<NodeId>) {
        self.commit_with(&CommitOptions::default())
    }

    pub fn commit_with(&self, options: &CommitOptions) -> (Snapshot, ImHashSet<NodeId>) {
        if self.changes.is_empty() {
            return (self.clone(), ImHashSet::new());
        }

        let started = std::time::Instant::now();
        CommitStarted {
            changed_count: self.changes.len(),
            level_count: self.meta.levels.len(),
        }
        .log();

        let mut values = self.values.read().clone();
        let initial_values = values.clone();
        let mut changed: ImHashSet<NodeId> = self.changes.clone();
        let mut unprocessed: ImHashSet<NodeId> = ImHashSet::new();

        'levels: for (level_idx, level) in self.meta.levels.iter().enumerate() {
            if level.is_empty() {
                continue;
            }

            let results = if options.parallel {
                self.run_level_parallel(level, &self.meta, &values, &changed, &initial_values, options.cancellation.as_ref())
            } else {
                level
                    .iter()
                    .map(|id| {
                        process_node(
                            id,
                            &self.meta,
                            &values,
                            &changed,
                            &initial_values,
                            options.cancellation.as_ref(),
                        )
                    })
                    .collect::<Vec<_>>()
            };

            for result in results {
                match result.outcome {
                    NodeOutcome::Unchanged => {}
                    NodeOutcome::Changed(value) => {
                        values.insert(result.id.clone(), value);
                        changed.insert(result.id);
                    }
                    NodeOutcome::Unprocessed => {
                        unprocessed.insert(result.id);
                    }
                }
            }

            if options
                .cancellation
                .as_ref()
                .map(|t| t.is_cancelled())
                .unwrap_or(false)
            {
                let mut remaining_count = 0;
                for remaining_level in &self.meta.levels[level_idx + 1..] {
                    for id in remaining_level {
                        if changed.contains(id) {
                            unprocessed.insert(id.clone());
                            remaining_count += 1;
                        }
                    }
                }
                CommitCancelled {
                    level_index: level_idx,
                    remaining_node_count: remaining_count,
                    level_count: self.meta.levels.len(),
                }
                .log();
                break 'levels;
            }
        }

        let actually_changed: ImHashSet<NodeId> =
            changed.into_iter().filter(|id| !unprocessed.contains(id)).collect();

        CommitCompleted {
            changed_count: actually_changed.len(),
            unprocessed_count: unprocessed.len(),
            duration: started.elapsed(),
        }
        .log();

        // A new version_id is only minted when the result is consistent: a
        // cancelled commit leaves `unprocessed` nodes outstanding, and such a
        // snapshot must still compare equal (by version_id) to the one it
        // was derived from rather than mint a fresh baseline it never fully
        // reached.
        let consistent = unprocessed.is_empty();
        let version_id = if consistent {
            NEXT_VERSION_ID.fetch_add(1, Ordering::Relaxed)
        } else {
            self.version_id
        };

        let next = Snapshot {
            meta: Arc::clone(&self.meta),
            values: Arc::new(RwLock::new(values)),
            initial_values,
            changes: unprocessed,
            version_id,
            lazy_guard: Arc::new(Mutex::new(())),
        };
        (next, actually_changed)
    }

    fn run_level_parallel(
        &self,
        level: &[NodeId],
        meta: &SharedNetworkMeta,
        values: &ValueMap,
        changes: &ImHashSet<NodeId>,
        initial_values: &ValueMap,
        cancellation: Option<&CancellationToken>,
    ) -> Vec<commit::NodeResult> {
        // `commit_with(parallel: true)` requires a Tokio runtime; callers
        // outside one should use the sequential path instead.
        let handle = tokio::runtime::Handle::current();
        let mut set = tokio::task::JoinSet::new();
        for id in level {
            let id = id.clone();
            let meta = Arc::clone(meta);
            let values = values.clone();
            let changes = changes.clone();
            let initial_values = initial_values.clone();
            let cancellation = cancellation.cloned();
            set.spawn_on(
                async move {
                    process_node(
                        &id,
                        &meta,
                        &values,
                        &changes,
                        &initial_values,
                        cancellation.as_ref(),
                    )
                },
                &handle,
            );
        }
        tokio::task::block_in_place(|| {
            handle.block_on(async {
                let mut results = Vec::with_capacity(level.len());
                while let Some(result) = set.join_next().await {
                    results.push(result.expect("commit task panicked"));
                }
                results
            })
        })
    }

    /// A point-in-time dump of every node's current value, keyed by node
    /// name — used by the façade's diagnostics surface and by tests.
    pub fn dump(&self) -> HashMap<String, ErasedValue> {
        let values = self.values.read();
        self.meta
            .node_ids()
            .filter_map(|id| values.get(id).map(|v| (id.name().to_string(), v.clone())))
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.changes.is_empty()
    }

    /// Equivalent of replacing a derived node's implementation in place: the
    /// node's identity and dependency edges are unchanged, only its computed
    /// value is invalidated so the next `commit` recomputes it.
    pub fn invalidate_value(&mut self, id: &NodeId) -> Result<(), GraphError> {
        if !self.meta.contains(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }
        // See the comment in `change_object_value`: branch off a fresh `Arc`
        // rather than mutating the one this snapshot's clones still share.
        let mut updated = self.values.read().clone();
        updated.insert(id.clone(), lazy_unresolved());
        self.values = Arc::new(RwLock::new(updated));
        self.changes.insert(id.clone());
        Ok(())
    }

    /// Seed a new [`crate::builder::Builder`] from this snapshot's current
    /// node list and values — the entry point for adding or removing nodes
    /// on a live graph. Nodes carried over keep their current value; nodes
    /// added to the returned builder get their own initial/default.
    pub fn change_configuration(&self) -> crate::builder::Builder {
        crate::builder::Builder::from_snapshot(self)
    }
}
