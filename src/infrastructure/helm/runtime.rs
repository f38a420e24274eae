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

use crate::shared::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One entry of the release store
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReleaseRecord {
    pub name: String,
    pub namespace: String,
    pub revision: String,
    pub status: String,
    pub chart: String,
    pub app_version: String,
}

/// What to install or upgrade. The chart directory pins the version.
#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    pub release_name: String,
    pub chart_path: PathBuf,
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl ReleaseRequest {
    pub fn new(release_name: impl Into<String>, chart_path: impl Into<PathBuf>) -> Self {
        Self {
            release_name: release_name.into(),
            chart_path: chart_path.into(),
            values: serde_json::Map::new(),
        }
    }
}

/// The packaged-application runtime that owns releases in the cluster
#[async_trait::async_trait]
pub trait ReleaseRuntime: Send + Sync {
    /// Releases named exactly `release`, in every lifecycle state
    async fn list_releases(&self, release: &str) -> Result<Vec<ReleaseRecord>>;

    /// Fetch and unpack `reference` at `version` below `dest`, returning the
    /// chart directory.
    async fn pull_chart(&self, reference: &str, version: &str, dest: &Path) -> Result<PathBuf>;

    async fn update_dependencies(&self, chart_path: &Path) -> Result<()>;

    async fn install(&self, request: &ReleaseRequest) -> Result<()>;

    async fn upgrade(&self, request: &ReleaseRequest) -> Result<()>;

    async fn uninstall(&self, release: &str) -> Result<()>;
}
