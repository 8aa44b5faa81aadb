// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors surfaced by the core graph: builder, snapshot, and façade.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The builder's topological sort found a node reachable from itself.
    #[error("circular dependency: {0:?}")]
    CircularDependency(Vec<String>),

    /// A derived node named a dependency the builder never registered.
    #[error("node '{processor_id}' depends on unregistered node '{missing_dependency}'")]
    MissingDependency {
        processor_id: String,
        missing_dependency: String,
    },

    /// An input node's `validate` rejected the proposed value.
    #[error("invalid value for input '{node}': {reason}")]
    InvalidInputValue { node: String, reason: String },

    /// `get_value`/`mark_changed`/`change_value` named a node absent from the
    /// snapshot.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// A derived node's `calculate` panicked or otherwise failed. The core
    /// itself never raises this — `calculate` is specified as infallible and
    /// panic-free — but the façade surfaces a caught panic from user code
    /// this way rather than dropping it silently.
    #[error("calculation for node '{node}' failed: {reason}")]
    CalculationError { node: String, reason: String },

    /// A forward-declared ([`crate::node::Placeholder`]) node was misused:
    /// rebound, or read before its first binding.
    #[error("invalid operation: {reason}")]
    InvalidOperation { reason: String },
}
