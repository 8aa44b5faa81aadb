// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::GraphError;

/// Errors raised while loading a [`crate::config::GraphConfig`] from a file or
/// while staging it into a [`crate::builder::Builder`]. Never raised by the
/// core graph itself.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config ({format}): {source}")]
    Parse {
        format: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("config names unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("node '{0}' names a calculation not present in the registry: '{1}'")]
    UnknownCalculation(String, String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
