// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller configuration file loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("artifact #{0} has an empty name or ref")]
    InvalidArtifact(usize),
}

/// One artifact pods can opt into attesting.
///
/// `name` is the value of the artifact label a pod must carry; `ref` is the
/// registry repository the attestation is written under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Server-side narrowing of the sensor subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodFilter {
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default, rename = "regex")]
    pub binary_regex: Vec<String>,
}

/// Controller config file.
///
/// ```yaml
/// artifacts:
///   - name: img
///     ref: registry.example.com/team/img
/// podFilter:
///   namespaces: [ci]
///   regex: ["/usr/bin/.*"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, rename = "podFilter")]
    pub pod_filter: PodFilter,
}

impl Config {
    /// Load and validate the YAML config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = serde_yaml::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        for (index, artifact) in config.artifacts.iter().enumerate() {
            if artifact.name.is_empty() || artifact.reference.is_empty() {
                return Err(ConfigError::InvalidArtifact(index));
            }
        }
        Ok(config)
    }

    /// The configured artifact a pod's label value names, if any.
    pub fn artifact_for(&self, label: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.name == label)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
