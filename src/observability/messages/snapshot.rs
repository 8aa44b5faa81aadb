// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for [`crate::snapshot::Snapshot::commit`]'s level-by-level
//! evaluation lifecycle.

use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

use super::StructuredLog;

/// A commit began with a known set of changed roots.
pub struct CommitStarted {
    pub changed_count: usize,
    pub level_count: usize,
}

impl Display for CommitStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "starting commit: {} changed root(s) across {} levels",
            self.changed_count, self.level_count
        )
    }
}

impl StructuredLog for CommitStarted {
    fn log(&self) {
        tracing::info!(
            changed_count = self.changed_count,
            level_count = self.level_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "commit",
            span_name = name,
            changed_count = self.changed_count,
            level_count = self.level_count,
        )
    }
}

/// A commit finished, changing a final set of nodes.
pub struct CommitCompleted {
    pub changed_count: usize,
    pub unprocessed_count: usize,
    pub duration: Duration,
}

impl Display for CommitCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "commit completed in {:?}: {} node(s) changed, {} unprocessed",
            self.duration, self.changed_count, self.unprocessed_count
        )
    }
}

impl StructuredLog for CommitCompleted {
    fn log(&self) {
        tracing::info!(
            changed_count = self.changed_count,
            unprocessed_count = self.unprocessed_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "commit_completed",
            span_name = name,
            changed_count = self.changed_count,
            unprocessed_count = self.unprocessed_count,
            duration = ?self.duration,
        )
    }
}

/// A commit was cancelled partway through; the remaining levels were left
/// unprocessed rather than recomputed.
pub struct CommitCancelled {
    pub level_index: usize,
    pub remaining_node_count: usize,
    pub level_count: usize,
}

impl Display for CommitCancelled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "commit cancelled after level {}/{}: {} node(s) left unprocessed",
            self.level_index, self.level_count, self.remaining_node_count
        )
    }
}

impl StructuredLog for CommitCancelled {
    fn log(&self) {
        tracing::warn!(
            level_index = self.level_index,
            level_count = self.level_count,
            remaining_node_count = self.remaining_node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "commit_cancelled",
            span_name = name,
            level_index = self.level_index,
            remaining_node_count = self.remaining_node_count,
        )
    }
}

/// A lazy node's value was resolved on read rather than during `commit`.
pub struct LazyResolutionCompleted {
    pub resolved_count: usize,
}

impl Display for LazyResolutionCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "resolved {} lazy node(s) on read", self.resolved_count)
    }
}

impl StructuredLog for LazyResolutionCompleted {
    fn log(&self) {
        tracing::debug!(resolved_count = self.resolved_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("lazy_resolution", span_name = name, resolved_count = self.resolved_count)
    }
}
