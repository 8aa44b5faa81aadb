// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Persistent, incrementally-evaluated dependency graphs of typed values.
//!
//! An input or derived node is declared once via [`builder::Builder`] and
//! frozen into an immutable [`snapshot::Snapshot`]; changing an input and
//! calling [`snapshot::Snapshot::commit`] produces a new snapshot with only
//! the affected derived nodes recomputed, level by level, the same way the
//! teacher's pipeline engine schedules processor recomputation across a
//! DAG. [`facade::StateGraph`] wraps that commit/snapshot cycle behind a
//! mutable, serialized, auto-committing API for long-lived callers.
//!
//! ```
//! use statedag::builder::Builder;
//! use statedag::nodes::{Sum, ValueInput};
//!
//! let mut builder = Builder::new();
//! let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
//! let b = builder.add_input("b", ValueInput::<i64>::new(), 2).unwrap();
//! let total = builder
//!     .add_calculation("total", Sum::<i64>::new(vec![a.id().clone(), b.id().clone()]))
//!     .unwrap();
//!
//! let mut snapshot = builder.build().unwrap();
//! assert_eq!(snapshot.get_value(&total).unwrap(), 3);
//!
//! snapshot.change_value(&a, 10).unwrap();
//! let (snapshot, changed) = snapshot.commit();
//! assert!(changed.contains(total.id()));
//! assert_eq!(snapshot.get_value(&total).unwrap(), 12);
//! ```

pub mod builder;
pub mod config;
pub mod errors;
pub mod facade;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod observability;
pub mod snapshot;

pub use builder::Builder;
pub use errors::{ConfigError, GraphError};
pub use facade::{
    register_derived_watched, watch_node_changes, ChangeNotification, NodeValueChanged,
    StateGraph, WeakStateGraph,
};
pub use node::{DerivedNode, ErasedValue, InputNode, NodeHandle, NodeId, Placeholder};
pub use snapshot::{CommitOptions, Snapshot};
