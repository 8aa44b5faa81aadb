// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::node::value::{erase, ErasedValue};

/// Sentinel stored in a lazy derived node's slot until the first
/// [`crate::snapshot::Snapshot::get_value`]/`get_value_async` call resolves it.
struct LazyUnresolved;

pub(crate) fn lazy_unresolved() -> ErasedValue {
    erase(LazyUnresolved)
}

pub(crate) fn is_lazy_unresolved(value: &ErasedValue) -> bool {
    value.downcast_ref::<LazyUnresolved>().is_some()
}
