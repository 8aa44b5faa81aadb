// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod graph;

pub use config::ConfigError;
pub use graph::GraphError;
