// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::errors::GraphError;
use crate::node::traits::DerivedNode;
use crate::node::value::ErasedValue;
use crate::node::NodeId;

/// A one-time-assignable forward reference, used to build structures whose
/// nodes refer to each other by name before every node exists.
///
/// `bind` may be called exactly once, before the placeholder is registered
/// with a [`crate::builder::Builder`] (`dependencies()` only reflects the
/// bound target, so the placeholder must be bound first). A second `bind`
/// fails with [`GraphError::InvalidOperation`]; so does a call made after
/// `on_build` has run — `on_build` freezes the binding. A placeholder used
/// before its first `bind` fails the same way: `Builder::build` checks
/// `validate_ready` on every node before evaluating or freezing any of
/// them, so an unbound placeholder is rejected there rather than panicking
/// the first time `calculate` runs.
pub struct Placeholder<N: DerivedNode> {
    target: OnceLock<N>,
    dependencies: OnceLock<Vec<NodeId>>,
    frozen: AtomicBool,
}

impl<N: DerivedNode> Placeholder<N> {
    pub fn new() -> Self {
        Self {
            target: OnceLock::new(),
            dependencies: OnceLock::new(),
            frozen: AtomicBool::new(false),
        }
    }

    /// Bind this placeholder to its eventual target. `dependencies` must match
    /// `target.dependencies()`; it is supplied separately because the target
    /// is not necessarily constructible with its own dependency list already
    /// in hand (that's the whole point of a forward reference).
    pub fn bind(&self, target: N, dependencies: Vec<NodeId>) -> Result<(), GraphError> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(GraphError::InvalidOperation {
                reason: "placeholder already frozen by on_build".into(),
            });
        }
        if self.target.set(target).is_err() {
            return Err(GraphError::InvalidOperation {
                reason: "placeholder already bound".into(),
            });
        }
        // unwrap: the OnceLock above is the single writer gate for both cells.
        self.dependencies
            .set(dependencies)
            .unwrap_or_else(|_| unreachable!("dependencies set twice despite target gate"));
        Ok(())
    }

    /// Panics if unbound — safe to call from the `DerivedNode` methods below
    /// only because `Builder::build` calls `validate_ready` on every node
    /// first, which is the one externally reachable path to this point.
    fn target(&self) -> &N {
        self.target
            .get()
            .expect("placeholder used before bind: internal invariant violated")
    }
}

impl<N: DerivedNode> Default for Placeholder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: DerivedNode> DerivedNode for Placeholder<N> {
    type Value = N::Value;

    fn dependencies(&self) -> &[NodeId] {
        self.dependencies
            .get()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn calculate(&self, inputs: &[ErasedValue]) -> Self::Value {
        self.target().calculate(inputs)
    }

    fn default_value(&self) -> Self::Value {
        self.target().default_value()
    }

    fn are_values_equal(&self, a: &Self::Value, b: &Self::Value) -> bool {
        self.target().are_values_equal(a, b)
    }

    fn is_lazy(&self) -> bool {
        self.target().is_lazy()
    }

    fn on_build(&self) {
        self.frozen.store(true, Ordering::Release);
        self.target().on_build();
    }

    fn validate_ready(&self) -> Result<(), GraphError> {
        if self.target.get().is_none() {
            return Err(GraphError::InvalidOperation {
                reason: "placeholder used before bind".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Sum;

    #[test]
    fn rebinding_fails() {
        let placeholder: Placeholder<Sum<i64>> = Placeholder::new();
        let sum = Sum::new(vec![NodeId::new("a"), NodeId::new("b")]);
        let deps = sum.dependencies().to_vec();
        placeholder.bind(sum, deps.clone()).unwrap();

        let second = Sum::new(deps.clone());
        let err = placeholder.bind(second, deps).unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperation { .. }));
    }

    #[test]
    fn use_before_bind_fails() {
        let placeholder: Placeholder<Sum<i64>> = Placeholder::new();
        let err = placeholder.validate_ready().unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperation { .. }));
    }
}
