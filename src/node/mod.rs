// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Node abstractions: the typed contract for input and derived nodes.
//!
//! Node kinds are unified as a capability set — `validate`/`calculate`/`deps`/
//! `is_lazy`/`are_equal`/`on_build` — tagged by [`erased::AnyNode`], rather
//! than a class hierarchy. [`NodeHandle`] is the thin typed handle callers
//! hold; [`NodeId`] is the untyped identity the graph and snapshot actually
//! index by.

pub(crate) mod erased;
mod handle;
mod id;
mod placeholder;
mod traits;
pub(crate) mod value;

pub use handle::NodeHandle;
pub use id::NodeId;
pub use placeholder::Placeholder;
pub use traits::{DerivedNode, InputNode};
pub use value::ErasedValue;
