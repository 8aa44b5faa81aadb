// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative graph construction: parse a YAML/JSON/TOML file describing
//! nodes and dependencies into a [`crate::builder::Builder`], the way the
//! teacher's `Config`/`ProcessorConfig` loader turns a pipeline YAML file
//! into a set of processors wired into a DAG.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::builder::Builder;
use crate::errors::{ConfigError, GraphError};
use crate::nodes::{ClampedInput, ValueInput};

use super::registry::builtin_calculations;

/// Whether a configured node is a plain input or a named calculation.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Input,
    Calculation,
}

/// One node in a declarative graph configuration.
///
/// # Example
/// ```yaml
/// nodes:
///   - id: a
///     type: input
///     initial_value: 1.0
///   - id: b
///     type: input
///     initial_value: 2.0
///   - id: total
///     type: calculation
///     calculation: sum
///     depends_on: [a, b]
/// ```
#[derive(Debug, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Required when `kind` is `Calculation`; names an entry registered in
    /// [`crate::config::registry::builtin_calculations`].
    pub calculation: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Required when `kind` is `Input`.
    pub initial_value: Option<f64>,
    /// Clamps an input's value into `[min, max]` instead of rejecting values
    /// outside the range, when both bounds are present.
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub lazy: bool,
}

/// A full declarative graph description, in node-declaration order. Nodes
/// may only depend on nodes declared earlier in the list — the same
/// constraint the teacher's processor configs place on `depends_on`.
#[derive(Debug, Deserialize)]
pub struct GraphConfig {
    pub nodes: Vec<NodeConfig>,
}

/// Parse a `GraphConfig` from a file, dispatching on its extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GraphConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            format: "yaml",
            source: source.into(),
        }),
        Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            format: "json",
            source: source.into(),
        }),
        Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::Parse {
            format: "toml",
            source: source.into(),
        }),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// Parse a `GraphConfig` and assemble it into a ready-to-build [`Builder`],
/// resolving calculation names through the built-in registry and validating
/// dependency order as it goes. Call [`crate::builder::Builder::build`] on
/// the result to get a consistent first [`crate::snapshot::Snapshot`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Builder, ConfigError> {
    let config = load_config(path)?;
    let calculations = builtin_calculations();
    let mut builder = Builder::new();
    let mut ids: HashMap<String, crate::node::NodeId> = HashMap::new();

    for node_config in &config.nodes {
        match node_config.kind {
            NodeKind::Input => {
                let initial = node_config.initial_value.ok_or_else(|| {
                    ConfigError::Graph(GraphError::InvalidOperation {
                        reason: format!("input node '{}' is missing initial_value", node_config.id),
                    })
                })?;
                let id = match (node_config.min, node_config.max) {
                    (Some(min), Some(max)) => builder
                        .add_input(node_config.id.clone(), ClampedInput::new(min, max), initial)?
                        .id()
                        .clone(),
                    _ => builder
                        .add_input(node_config.id.clone(), ValueInput::<f64>::new(), initial)?
                        .id()
                        .clone(),
                };
                ids.insert(node_config.id.clone(), id);
            }
            NodeKind::Calculation => {
                let calculation_name = node_config.calculation.as_deref().ok_or_else(|| {
                    ConfigError::Graph(GraphError::InvalidOperation {
                        reason: format!("calculation node '{}' is missing 'calculation'", node_config.id),
                    })
                })?;
                let constructor = calculations.get(calculation_name).ok_or_else(|| {
                    ConfigError::UnknownCalculation(node_config.id.clone(), calculation_name.to_string())
                })?;

                let mut deps = Vec::with_capacity(node_config.depends_on.len());
                for dep_name in &node_config.depends_on {
                    let dep_id = ids.get(dep_name).cloned().ok_or_else(|| {
                        ConfigError::Graph(GraphError::MissingDependency {
                            processor_id: node_config.id.clone(),
                            missing_dependency: dep_name.clone(),
                        })
                    })?;
                    deps.push(dep_id);
                }

                let id = crate::node::NodeId::new(node_config.id.clone());
                ids.insert(node_config.id.clone(), id.clone());
                builder.add_any_node(constructor(id, deps));
            }
        }
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn loads_a_simple_sum_graph() {
        let yaml = r#"
nodes:
  - id: a
    type: input
    initial_value: 1.0
  - id: b
    type: input
    initial_value: 2.0
  - id: total
    type: calculation
    calculation: sum
    depends_on: [a, b]
"#;
        let file = write_temp(yaml, ".yaml");
        let builder = load_and_validate_config(file.path()).unwrap();
        let snapshot = builder.build().unwrap();
        assert_eq!(snapshot.nodes().count(), 3);
    }

    #[test]
    fn unknown_calculation_name_is_an_error() {
        let yaml = r#"
nodes:
  - id: a
    type: input
    initial_value: 1.0
  - id: total
    type: calculation
    calculation: not_a_real_calculation
    depends_on: [a]
"#;
        let file = write_temp(yaml, ".yaml");
        let err = load_and_validate_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCalculation(_, _)));
    }

    #[test]
    fn unresolved_dependency_is_an_error() {
        let yaml = r#"
nodes:
  - id: total
    type: calculation
    calculation: sum
    depends_on: [nonexistent]
"#;
        let file = write_temp(yaml, ".yaml");
        let err = load_and_validate_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Graph(GraphError::MissingDependency { .. })));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let file = write_temp("nodes: []", ".ini");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }
}
