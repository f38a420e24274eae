// Copyright 2025 Cosmonic.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unpacked chart directories

use crate::shared::error::{CosmoError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The subset of `Chart.yaml` the plugin needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
    pub app_version: Option<String>,
    pub description: Option<String>,
    pub dependencies: Vec<ChartDependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDependency {
    pub name: String,
    pub version: String,
    pub repository: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub path: PathBuf,
    pub metadata: ChartMetadata,
}

impl LoadedChart {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manifest = path.join("Chart.yaml");

        let content = fs::read_to_string(&manifest).map_err(|e| {
            CosmoError::ChartLoadFailed(format!("cannot read {}: {}", manifest.display(), e))
        })?;
        let metadata: ChartMetadata = serde_yaml::from_str(&content).map_err(|e| {
            CosmoError::ChartLoadFailed(format!("invalid {}: {}", manifest.display(), e))
        })?;

        if metadata.name.is_empty() {
            return Err(CosmoError::ChartLoadFailed(format!(
                "{} has no chart name",
                manifest.display()
            )));
        }

        Ok(Self { path, metadata })
    }

    /// Declared dependencies with no matching entry under `charts/`.
    ///
    /// A dependency counts as vendored when `charts/` holds a directory or
    /// archive whose name starts with the dependency name.
    pub fn missing_dependencies(&self) -> Vec<&ChartDependency> {
        let vendored: Vec<String> = fs::read_dir(self.path.join("charts"))
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        self.metadata
            .dependencies
            .iter()
            .filter(|dep| !vendored.iter().any(|entry| entry.starts_with(&dep.name)))
            .collect()
    }
}
