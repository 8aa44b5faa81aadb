// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the builder, snapshot, and façade.
//!
//! Message types follow a struct-based pattern with a `Display` impl so
//! that:
//!
//! * No magic strings are scattered through the core modules
//! * Each event's fields are typed and queryable once emitted through
//!   `tracing`'s structured fields rather than embedded only in text
//! * Adding a field to an event is a one-place change
//!
//! # Usage
//!
//! ```
//! use statedag::observability::messages::{StructuredLog, builder::GraphBuilt};
//!
//! let msg = GraphBuilt { node_count: 5, level_count: 3 };
//! tracing::info!("{}", msg);
//! msg.log();
//! ```

pub mod messages;
