// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The per-node decision made during `commit`, generalized from the
//! level-by-level executor's `execute_level`/`process` step: each derived node
//! in a level is independently classified as unchanged, changed (with its new
//! value), or unprocessed (cancelled before it could run).

use im::HashSet as ImHashSet;
use tokio_util::sync::CancellationToken;

use crate::graph::NetworkMeta;
use crate::node::value::ErasedValue;
use crate::node::NodeId;
use crate::snapshot::lazy::lazy_unresolved;
use crate::snapshot::ValueMap;

pub(crate) enum NodeOutcome {
    Unchanged,
    Changed(ErasedValue),
    Unprocessed,
}

pub(crate) struct NodeResult {
    pub id: NodeId,
    pub outcome: NodeOutcome,
}

/// Evaluate one derived node's commit step.
///
/// `values`/`changes`/`initial_values` are the *pre-commit* snapshots of this
/// level's inputs — every node in the same level reads from the same
/// consistent view, which is what makes same-level evaluation order-
/// independent (testable property 9, parallelism determinism).
pub(crate) fn process_node(
    id: &NodeId,
    meta: &NetworkMeta,
    values: &ValueMap,
    changes: &ImHashSet<NodeId>,
    initial_values: &ValueMap,
    cancellation: Option<&CancellationToken>,
) -> NodeResult {
    let node = meta
        .node(id)
        .expect("node scheduled in its own level: internal invariant violated");
    let derived = node
        .as_derived()
        .expect("only derived nodes are scheduled into levels");

    let any_deps_changed =
        changes.contains(id) || derived.dependencies().iter().any(|d| changes.contains(d));

    if !any_deps_changed {
        return NodeResult {
            id: id.clone(),
            outcome: NodeOutcome::Unchanged,
        };
    }

    if meta.is_lazy(id) {
        // Defer the recompute to the next `get_value`/`get_value_async`, but
        // still propagate dirtiness downstream — see SPEC_FULL.md's Open
        // Question decision (propagate-dirtiness variant).
        return NodeResult {
            id: id.clone(),
            outcome: NodeOutcome::Changed(lazy_unresolved()),
        };
    }

    if cancellation.map(|t| t.is_cancelled()).unwrap_or(false) {
        return NodeResult {
            id: id.clone(),
            outcome: NodeOutcome::Unprocessed,
        };
    }

    let inputs: Vec<ErasedValue> = derived
        .dependencies()
        .iter()
        .map(|dep| {
            values
                .get(dep)
                .cloned()
                .expect("dependency missing a value slot: internal invariant violated")
        })
        .collect();

    let new_value = derived.calculate(&inputs);
    let changed = match initial_values.get(id) {
        Some(previous) => !derived.are_values_equal(previous, &new_value),
        None => true,
    };

    if changed {
        NodeResult {
            id: id.clone(),
            outcome: NodeOutcome::Changed(new_value),
        }
    } else {
        NodeResult {
            id: id.clone(),
            outcome: NodeOutcome::Unchanged,
        }
    }
}
