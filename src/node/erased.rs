// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::errors::GraphError;
use crate::node::traits::{DerivedNode, InputNode};
use crate::node::value::{downcast, erase, ErasedValue};
use crate::node::NodeId;

/// Object-safe counterpart of [`InputNode`], obtained by erasing `Value`.
///
/// Node kinds are unified as a capability set (`validate`/`calculate`/`deps`/
/// `is_lazy`/`are_equal`/`on_build`) behind tagged [`AnyNode`] variants rather
/// than a deep inheritance hierarchy — user code never implements this trait
/// directly, it is derived automatically for every [`InputNode`] via
/// [`InputWrapper`].
pub(crate) trait ErasedInputNode: Send + Sync {
    fn id(&self) -> &NodeId;
    fn validate(&self, value: ErasedValue) -> Result<ErasedValue, GraphError>;
    fn are_values_equal(&self, a: &ErasedValue, b: &ErasedValue) -> bool;
}

/// Object-safe counterpart of [`DerivedNode`].
pub(crate) trait ErasedDerivedNode: Send + Sync {
    fn id(&self) -> &NodeId;
    fn dependencies(&self) -> &[NodeId];
    fn calculate(&self, inputs: &[ErasedValue]) -> ErasedValue;
    fn default_value(&self) -> ErasedValue;
    fn are_values_equal(&self, a: &ErasedValue, b: &ErasedValue) -> bool;
    fn is_lazy(&self) -> bool;
    fn on_build(&self);
    fn validate_ready(&self) -> Result<(), GraphError>;
}

pub(crate) struct InputWrapper<N: InputNode> {
    id: NodeId,
    inner: N,
}

impl<N: InputNode> InputWrapper<N> {
    pub fn new(id: NodeId, inner: N) -> Self {
        Self { id, inner }
    }
}

impl<N: InputNode> ErasedInputNode for InputWrapper<N> {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn validate(&self, value: ErasedValue) -> Result<ErasedValue, GraphError> {
        let typed = downcast::<N::Value>(&value).clone();
        let validated = self
            .inner
            .validate(typed)
            .map_err(|reason| GraphError::InvalidInputValue {
                node: self.id.to_string(),
                reason,
            })?;
        Ok(erase(validated))
    }

    fn are_values_equal(&self, a: &ErasedValue, b: &ErasedValue) -> bool {
        self.inner
            .are_values_equal(downcast::<N::Value>(a), downcast::<N::Value>(b))
    }
}

pub(crate) struct DerivedWrapper<N: DerivedNode> {
    id: NodeId,
    inner: N,
}

impl<N: DerivedNode> DerivedWrapper<N> {
    pub fn new(id: NodeId, inner: N) -> Self {
        Self { id, inner }
    }
}

impl<N: DerivedNode> ErasedDerivedNode for DerivedWrapper<N> {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn dependencies(&self) -> &[NodeId] {
        self.inner.dependencies()
    }

    fn calculate(&self, inputs: &[ErasedValue]) -> ErasedValue {
        erase(self.inner.calculate(inputs))
    }

    fn default_value(&self) -> ErasedValue {
        erase(self.inner.default_value())
    }

    fn are_values_equal(&self, a: &ErasedValue, b: &ErasedValue) -> bool {
        self.inner
            .are_values_equal(downcast::<N::Value>(a), downcast::<N::Value>(b))
    }

    fn is_lazy(&self) -> bool {
        self.inner.is_lazy()
    }

    fn on_build(&self) {
        self.inner.on_build()
    }

    fn validate_ready(&self) -> Result<(), GraphError> {
        self.inner.validate_ready()
    }
}

/// A node, tagged by kind, behind a uniform handle the graph can store in a
/// single heterogeneous collection.
#[derive(Clone)]
pub(crate) enum AnyNode {
    Input(Arc<dyn ErasedInputNode>),
    Derived(Arc<dyn ErasedDerivedNode>),
}

impl AnyNode {
    pub fn id(&self) -> &NodeId {
        match self {
            AnyNode::Input(n) => n.id(),
            AnyNode::Derived(n) => n.id(),
        }
    }

    pub fn dependencies(&self) -> &[NodeId] {
        match self {
            AnyNode::Input(_) => &[],
            AnyNode::Derived(n) => n.dependencies(),
        }
    }

    pub fn declared_lazy(&self) -> bool {
        match self {
            AnyNode::Input(_) => false,
            AnyNode::Derived(n) => n.is_lazy(),
        }
    }

    pub fn default_value(&self, input_initial: Option<&ErasedValue>) -> Option<ErasedValue> {
        match self {
            AnyNode::Input(_) => input_initial.cloned(),
            AnyNode::Derived(n) => Some(n.default_value()),
        }
    }

    pub fn are_values_equal(&self, a: &ErasedValue, b: &ErasedValue) -> bool {
        match self {
            AnyNode::Input(n) => n.are_values_equal(a, b),
            AnyNode::Derived(n) => n.are_values_equal(a, b),
        }
    }

    pub fn on_build(&self) {
        if let AnyNode::Derived(n) = self {
            n.on_build();
        }
    }

    pub fn validate_ready(&self) -> Result<(), GraphError> {
        match self {
            AnyNode::Input(_) => Ok(()),
            AnyNode::Derived(n) => n.validate_ready(),
        }
    }

    pub fn as_derived(&self) -> Option<&Arc<dyn ErasedDerivedNode>> {
        match self {
            AnyNode::Derived(n) => Some(n),
            AnyNode::Input(_) => None,
        }
    }

    pub fn as_input(&self) -> Option<&Arc<dyn ErasedInputNode>> {
        match self {
            AnyNode::Input(n) => Some(n),
            AnyNode::Derived(_) => None,
        }
    }
}
