// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::Any;
use std::sync::Arc;

/// A type-erased node value.
///
/// The snapshot's value map is heterogeneous: input and derived nodes of
/// different `T`s all live in one map keyed by [`crate::node::NodeId`]. Values
/// are stored behind `Arc<dyn Any + Send + Sync>` so they are cheap to clone
/// (the `im` maps clone on structural-sharing operations) and typed reads can
/// downcast at the boundary.
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

pub fn erase<T: Send + Sync + 'static>(value: T) -> ErasedValue {
    Arc::new(value)
}

/// Downcast an erased value back to `T`.
///
/// Panics if `value` was not produced from a `T`. This can only happen from a
/// programming error inside this crate (a node's declared dependency type
/// disagreeing with what was actually stored for that id) — never from
/// caller-supplied data — so it is treated the same way the teacher treats
/// `Arc::try_unwrap` failing on a ref count it guarantees is unique: a bug, not
/// a reportable error.
pub fn downcast<T: Send + Sync + 'static>(value: &ErasedValue) -> &T {
    value
        .downcast_ref::<T>()
        .expect("node value type mismatch: internal invariant violated")
}
