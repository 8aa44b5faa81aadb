// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the mutable façade's serialized commit queue and
//! change-notification events.

use std::fmt::{Display, Formatter};
use tracing::Span;

use super::StructuredLog;

/// A mutation was applied while auto-commit is disabled, so it will not take
/// effect until every outstanding [`crate::facade::AutoCommitGuard`] for this
/// façade drops. `queue_depth` is that guard nesting depth.
pub struct MutationQueued {
    pub queue_depth: usize,
}

impl Display for MutationQueued {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "mutation deferred, {} guard(s) still outstanding", self.queue_depth)
    }
}

impl StructuredLog for MutationQueued {
    fn log(&self) {
        tracing::debug!(queue_depth = self.queue_depth, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("mutation_queued", span_name = name, queue_depth = self.queue_depth)
    }
}

/// Auto-commit was suspended or resumed by a `disable_auto_commit` guard.
pub struct AutoCommitToggled {
    pub enabled: bool,
    pub nesting_depth: u32,
}

impl Display for AutoCommitToggled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "auto-commit {} (nesting depth {})",
            if self.enabled { "enabled" } else { "disabled" },
            self.nesting_depth
        )
    }
}

impl StructuredLog for AutoCommitToggled {
    fn log(&self) {
        tracing::debug!(
            enabled = self.enabled,
            nesting_depth = self.nesting_depth,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "auto_commit_toggled",
            span_name = name,
            enabled = self.enabled,
            nesting_depth = self.nesting_depth,
        )
    }
}

/// Subscribers were notified of a published snapshot change.
pub struct StateChangeNotified {
    pub subscriber_count: usize,
    pub changed_count: usize,
}

impl Display for StateChangeNotified {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "notified {} subscriber(s) of {} changed node(s)",
            self.subscriber_count, self.changed_count
        )
    }
}

impl StructuredLog for StateChangeNotified {
    fn log(&self) {
        tracing::debug!(
            subscriber_count = self.subscriber_count,
            changed_count = self.changed_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "state_change_notified",
            span_name = name,
            subscriber_count = self.subscriber_count,
            changed_count = self.changed_count,
        )
    }
}

/// An in-flight commit was superseded by a newer mutation before it
/// finished, and its cancellation token was signalled.
pub struct CommitSuperseded {
    pub superseded_version_id: u64,
}

impl Display for CommitSuperseded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "commit for version {} superseded before completion", self.superseded_version_id)
    }
}

impl StructuredLog for CommitSuperseded {
    fn log(&self) {
        tracing::info!(superseded_version_id = self.superseded_version_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "commit_superseded",
            span_name = name,
            superseded_version_id = self.superseded_version_id,
        )
    }
}

/// A background commit task's call into user code panicked. Caught at the
/// task boundary and reported via [`crate::facade::StateGraph::wait_for_all_pending`]
/// rather than `OnStateChanged`.
pub struct CommitTaskFailed {
    pub reason: String,
}

impl Display for CommitTaskFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "commit task failed: {}", self.reason)
    }
}

impl StructuredLog for CommitTaskFailed {
    fn log(&self) {
        tracing::error!(reason = %self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("commit_task_failed", span_name = name, reason = %self.reason)
    }
}
