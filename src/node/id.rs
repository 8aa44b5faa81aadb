// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable, hashable identity for a node.
///
/// Two `NodeId`s are equal iff they were produced by the same call to
/// [`NodeId::new`] — the name is carried along for diagnostics only and never
/// participates in equality or hashing, so renaming a node (or two nodes
/// sharing a display name) can never cause an identity collision.
#[derive(Clone)]
pub struct NodeId {
    ordinal: u64,
    name: Arc<str>,
}

impl NodeId {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            ordinal: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal
    }
}

impl Eq for NodeId {}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordinal.hash(state);
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.ordinal)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_even_with_same_name() {
        let a = NodeId::new("x");
        let b = NodeId::new("x");
        assert_ne!(a, b);
    }

    #[test]
    fn clone_preserves_identity() {
        let a = NodeId::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }
}
