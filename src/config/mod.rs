// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative graph construction from YAML/JSON/TOML, for callers who would
//! rather describe a graph's shape as data than as a sequence of
//! `Builder::add_input`/`add_calculation` calls.

mod loader;
pub(crate) mod registry;

pub use loader::{load_and_validate_config, load_config, GraphConfig, NodeConfig, NodeKind};
