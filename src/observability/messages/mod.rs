// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging, organized by subsystem:
//!
//! * `builder` — graph assembly and validation events
//! * `snapshot` — commit lifecycle events
//! * `facade` — serialized-commit-queue and change-notification events

pub mod builder;
pub mod facade;
pub mod snapshot;

use tracing::Span;

/// A loggable event that also knows how to describe itself as a trace span.
pub trait StructuredLog {
    /// Emit this event through `tracing`, human-readable message plus
    /// structured fields.
    fn log(&self);

    /// An OpenTelemetry-compatible span carrying this event's fields as
    /// attributes.
    fn span(&self, name: &str) -> Span;
}
