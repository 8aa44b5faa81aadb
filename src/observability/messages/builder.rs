// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph assembly: [`crate::builder::Builder::build`]'s
//! validation and level-computation steps.

use std::fmt::{Display, Formatter};
use tracing::Span;

use super::StructuredLog;

/// A graph was validated, topologically sorted, and leveled successfully.
pub struct GraphBuilt {
    pub node_count: usize,
    pub level_count: usize,
}

impl Display for GraphBuilt {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "built graph with {} nodes across {} levels",
            self.node_count, self.level_count
        )
    }
}

impl StructuredLog for GraphBuilt {
    fn log(&self) {
        tracing::info!(
            node_count = self.node_count,
            level_count = self.level_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph_built",
            span_name = name,
            node_count = self.node_count,
            level_count = self.level_count,
        )
    }
}

/// Topological sort failed because the node set contains a cycle.
pub struct CircularDependencyDetected<'a> {
    pub path: &'a [String],
}

impl Display for CircularDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "circular dependency detected: {}", self.path.join(" -> "))
    }
}

impl StructuredLog for CircularDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(path = ?self.path, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("circular_dependency", span_name = name, path = ?self.path)
    }
}

/// A derived node named a dependency the builder never registered.
pub struct MissingDependencyDetected<'a> {
    pub processor_id: &'a str,
    pub missing_dependency: &'a str,
}

impl Display for MissingDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "node '{}' depends on unregistered node '{}'",
            self.processor_id, self.missing_dependency
        )
    }
}

impl StructuredLog for MissingDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(
            processor_id = self.processor_id,
            missing_dependency = self.missing_dependency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "missing_dependency",
            span_name = name,
            processor_id = self.processor_id,
            missing_dependency = self.missing_dependency,
        )
    }
}

/// A node and its transitive dependents were removed from a builder in
/// progress.
pub struct NodesRemoved {
    pub removed_count: usize,
}

impl Display for NodesRemoved {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "removed {} node(s) and their dependents", self.removed_count)
    }
}

impl StructuredLog for NodesRemoved {
    fn log(&self) {
        tracing::info!(removed_count = self.removed_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("nodes_removed", span_name = name, removed_count = self.removed_count)
    }
}
