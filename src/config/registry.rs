// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Maps a calculation name from a declarative graph config to the
//! constructor for the derived node it names, the same name→constructor
//! indirection the teacher uses to turn a processor config's `type`/
//! `processor` fields into a runtime `Arc<dyn Processor>`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::erased::{AnyNode, DerivedWrapper};
use crate::node::NodeId;
use crate::nodes::{MinMax, Product, Sum};

/// Builds the `AnyNode` for one calculation entry, given its own id (taken
/// from the config) and its already-resolved dependency ids.
pub(crate) type CalculationConstructor = fn(NodeId, Vec<NodeId>) -> AnyNode;

fn sum(id: NodeId, deps: Vec<NodeId>) -> AnyNode {
    AnyNode::Derived(Arc::new(DerivedWrapper::new(id, Sum::<f64>::new(deps))))
}

fn product(id: NodeId, deps: Vec<NodeId>) -> AnyNode {
    AnyNode::Derived(Arc::new(DerivedWrapper::new(id, Product::<f64>::new(deps, 1.0))))
}

fn minmax(id: NodeId, deps: Vec<NodeId>) -> AnyNode {
    AnyNode::Derived(Arc::new(DerivedWrapper::new(id, MinMax::<f64>::new(deps, 0.0))))
}

/// The built-in calculation names available to declarative graph configs.
/// Every entry corresponds to one of the reference [`crate::nodes`]
/// implementations, parameterized over `f64` — config-driven graphs trade
/// the generic `T` of the programmatic [`crate::builder::Builder`] API for a
/// single numeric type, since YAML/JSON/TOML carry no type annotations of
/// their own.
pub(crate) fn builtin_calculations() -> HashMap<&'static str, CalculationConstructor> {
    let mut registry: HashMap<&'static str, CalculationConstructor> = HashMap::new();
    registry.insert("sum", sum);
    registry.insert("product", product);
    registry.insert("minmax", minmax);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_calculations_cover_the_documented_names() {
        let registry = builtin_calculations();
        assert!(registry.contains_key("sum"));
        assert!(registry.contains_key("product"));
        assert!(registry.contains_key("minmax"));
    }
}
