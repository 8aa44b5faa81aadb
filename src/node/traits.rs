// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::GraphError;
use crate::node::value::ErasedValue;
use crate::node::NodeId;

/// Contract for an input node: a typed value holder the client mutates.
///
/// `validate` is invoked on every input mutation before the value is stored.
/// It may coerce the value (clamping, trimming, normalizing) or reject it
/// outright by returning `Err(reason)` — the node itself doesn't know its own
/// identity, so the wrapper that holds it (see [`crate::node::erased`]) is
/// what turns a rejection into a
/// [`crate::errors::GraphError::InvalidInputValue`] naming the node. The
/// default implementation is identity.
pub trait InputNode: Send + Sync {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn validate(&self, value: Self::Value) -> Result<Self::Value, String> {
        Ok(value)
    }

    /// Decide whether two values are "the same" for change-detection purposes.
    /// Default: structural equality. Override for e.g. floating-point tolerance.
    fn are_values_equal(&self, a: &Self::Value, b: &Self::Value) -> bool {
        a == b
    }
}

/// Contract for a derived node: a pure function of other nodes' current values.
///
/// `dependencies()` must return nodes in the same order `calculate` expects
/// them in `inputs`. `calculate` must be deterministic and side-effect free;
/// it receives type-erased dependency values and downcasts them itself, since
/// dependencies may have heterogeneous types that Rust's type system cannot
/// express as a single tuple here.
pub trait DerivedNode: Send + Sync {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn dependencies(&self) -> &[NodeId];

    fn calculate(&self, inputs: &[ErasedValue]) -> Self::Value;

    /// Value held in this node's slot before its first successful commit.
    fn default_value(&self) -> Self::Value;

    fn are_values_equal(&self, a: &Self::Value, b: &Self::Value) -> bool {
        a == b
    }

    /// True if this node is declared lazy. A node is also lazy if any of its
    /// transitive dependencies are lazy, but that is determined by the graph,
    /// not by this flag — see [`crate::graph::NetworkMeta`].
    fn is_lazy(&self) -> bool {
        false
    }

    /// One-time hook invoked the first time a snapshot that includes this node
    /// is built. A common use is freezing a placeholder binding (see
    /// [`crate::node::Placeholder`]).
    fn on_build(&self) {}

    /// Checked once by [`crate::builder::Builder::build`] before this node is
    /// ever evaluated or frozen via `on_build`. The default is always ready;
    /// [`crate::node::Placeholder`] overrides this to fail with
    /// [`GraphError::InvalidOperation`] when read before it's bound, rather
    /// than panicking the first time something actually calls `calculate`.
    fn validate_ready(&self) -> Result<(), GraphError> {
        Ok(())
    }
}
