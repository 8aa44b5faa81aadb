// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::marker::PhantomData;

use crate::node::NodeId;

/// A thin, typed handle around an erased node identity.
///
/// `Builder::add_input`/`add_calculation` return a `NodeHandle<T>` rather than
/// a bare [`NodeId`] so that `Snapshot::get_value`/`change_value` can return
/// `T` directly instead of requiring every call site to downcast.
pub struct NodeHandle<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> NodeHandle<T> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }
}

impl<T> Clone for NodeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for NodeHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeHandle({:?})", self.id)
    }
}

impl<T> PartialEq for NodeHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for NodeHandle<T> {}
