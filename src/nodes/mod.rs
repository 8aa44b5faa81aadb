// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reference node implementations used by this crate's own tests and by
//! `demos/`.
//!
//! These are demonstration scaffolding, not load-bearing parts of the core —
//! mirroring the teacher's `backends::local::processors::*` family and its
//! `StubProcessor` test double. A real caller supplies its own
//! [`crate::node::InputNode`]/[`crate::node::DerivedNode`] implementations;
//! nothing here is required to use the crate.

use std::marker::PhantomData;
use std::ops::{Add, Mul};

use crate::node::value::ErasedValue;
use crate::node::{DerivedNode, InputNode, NodeId};

/// A plain input node with no coercion: `validate` is identity.
pub struct ValueInput<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ValueInput<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ValueInput<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> InputNode for ValueInput<T> {
    type Value = T;
}

/// An input node that clamps its value into `[min, max]` rather than
/// rejecting out-of-range values, used to build the clamped-range scenario
/// (`change_value(x, 6)` on a `[1,5]` input yields `5`).
pub struct ClampedInput<T> {
    min: T,
    max: T,
}

impl<T: PartialOrd + Copy> ClampedInput<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + Copy + PartialEq + Send + Sync + 'static> InputNode for ClampedInput<T> {
    type Value = T;

    fn validate(&self, value: T) -> Result<T, String> {
        if value < self.min {
            Ok(self.min)
        } else if value > self.max {
            Ok(self.max)
        } else {
            Ok(value)
        }
    }
}

/// Sums the current values of its dependencies, in order.
pub struct Sum<T> {
    deps: Vec<NodeId>,
    lazy: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Sum<T> {
    pub fn new(deps: Vec<NodeId>) -> Self {
        Self {
            deps,
            lazy: false,
            _marker: PhantomData,
        }
    }

    pub fn lazy(deps: Vec<NodeId>) -> Self {
        Self {
            deps,
            lazy: true,
            _marker: PhantomData,
        }
    }
}

impl<T> DerivedNode for Sum<T>
where
    T: Add<Output = T> + Default + Copy + PartialEq + Send + Sync + 'static,
{
    type Value = T;

    fn dependencies(&self) -> &[NodeId] {
        &self.deps
    }

    fn calculate(&self, inputs: &[ErasedValue]) -> T {
        inputs
            .iter()
            .map(|v| *crate::node::value::downcast::<T>(v))
            .fold(T::default(), |acc, x| acc + x)
    }

    fn default_value(&self) -> T {
        T::default()
    }

    fn is_lazy(&self) -> bool {
        self.lazy
    }
}

/// Multiplies the current values of its dependencies, in order.
pub struct Product<T> {
    deps: Vec<NodeId>,
    identity: T,
}

impl<T: Copy> Product<T> {
    pub fn new(deps: Vec<NodeId>, identity: T) -> Self {
        Self { deps, identity }
    }
}

impl<T> DerivedNode for Product<T>
where
    T: Mul<Output = T> + Copy + PartialEq + Send + Sync + 'static,
{
    type Value = T;

    fn dependencies(&self) -> &[NodeId] {
        &self.deps
    }

    fn calculate(&self, inputs: &[ErasedValue]) -> T {
        inputs
            .iter()
            .map(|v| *crate::node::value::downcast::<T>(v))
            .fold(self.identity, |acc, x| acc * x)
    }

    fn default_value(&self) -> T {
        self.identity
    }
}

/// Tracks the minimum and maximum of its dependencies' current values.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MinMaxValue<T> {
    pub min: T,
    pub max: T,
}

pub struct MinMax<T> {
    deps: Vec<NodeId>,
    default: MinMaxValue<T>,
}

impl<T: Copy> MinMax<T> {
    pub fn new(deps: Vec<NodeId>, default: T) -> Self {
        Self {
            deps,
            default: MinMaxValue {
                min: default,
                max: default,
            },
        }
    }
}

impl<T> DerivedNode for MinMax<T>
where
    T: PartialOrd + Copy + PartialEq + Send + Sync + 'static,
{
    type Value = MinMaxValue<T>;

    fn dependencies(&self) -> &[NodeId] {
        &self.deps
    }

    fn calculate(&self, inputs: &[ErasedValue]) -> MinMaxValue<T> {
        let mut values = inputs.iter().map(|v| *crate::node::value::downcast::<T>(v));
        let first = values.next().unwrap_or(self.default.min);
        values.fold(MinMaxValue { min: first, max: first }, |acc, x| MinMaxValue {
            min: if x < acc.min { x } else { acc.min },
            max: if x > acc.max { x } else { acc.max },
        })
    }

    fn default_value(&self) -> MinMaxValue<T> {
        self.default
    }
}

/// Wraps an arbitrary closure as a derived node, for ad hoc graphs in tests
/// (mirrors the teacher's general-purpose `CustomCollector`).
pub struct Lambda<T> {
    deps: Vec<NodeId>,
    default: T,
    f: Box<dyn Fn(&[ErasedValue]) -> T + Send + Sync>,
}

impl<T> Lambda<T> {
    pub fn new(
        deps: Vec<NodeId>,
        default: T,
        f: impl Fn(&[ErasedValue]) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            deps,
            default,
            f: Box::new(f),
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> DerivedNode for Lambda<T> {
    type Value = T;

    fn dependencies(&self) -> &[NodeId] {
        &self.deps
    }

    fn calculate(&self, inputs: &[ErasedValue]) -> T {
        (self.f)(inputs)
    }

    fn default_value(&self) -> T {
        self.default.clone()
    }
}
