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

//! Install, update, uninstall and inspect the Cosmonic charts.

use super::component::Component;
use super::loader::LoadedChart;
use super::version::{is_update_available, latest_version};
use crate::infrastructure::helm::{ReleaseRequest, ReleaseRuntime};
use crate::infrastructure::registry::TagSource;
use crate::shared::error::{CosmoError, Result};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

/// Installed and available versions of one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRelease {
    pub component: Component,
    pub installed_version: Option<String>,
    pub available_version: String,
}

impl ChartRelease {
    pub fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }

    pub fn update_available(&self) -> bool {
        self.installed_version
            .as_deref()
            .is_some_and(|installed| is_update_available(installed, &self.available_version))
    }
}

pub struct ChartManager {
    runtime: Arc<dyn ReleaseRuntime>,
    tags: Arc<dyn TagSource>,
}

impl ChartManager {
    pub fn new(runtime: Arc<dyn ReleaseRuntime>, tags: Arc<dyn TagSource>) -> Self {
        Self { runtime, tags }
    }

    /// Application version of the first release named after the component.
    pub async fn installed_version(&self, component: &Component) -> Result<String> {
        let releases = self.runtime.list_releases(component.release_name).await?;
        releases
            .into_iter()
            .find(|release| release.name == component.release_name)
            .map(|release| release.app_version)
            .ok_or_else(|| CosmoError::ReleaseNotFound {
                release: component.release_name.to_string(),
            })
    }

    /// Highest tag published for the component's chart.
    pub async fn available_version(&self, component: &Component) -> Result<String> {
        let repository = component.repository();
        let tags = self.tags.list_tags(&repository).await?;
        latest_version(&tags).ok_or(CosmoError::NoTags { repository })
    }

    pub async fn install(&self, component: &Component) -> Result<String> {
        match self.installed_version(component).await {
            Ok(version) if !version.is_empty() => {
                return Err(CosmoError::AlreadyInstalled {
                    chart: component.chart_name.to_string(),
                    version,
                })
            }
            Ok(_) | Err(CosmoError::ReleaseNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let version = self.available_version(component).await?;
        info!(chart = component.chart_name, %version, "Installing chart");

        let workdir = TempDir::new()?;
        let chart = self.prepare_chart(component, &version, workdir.path()).await?;
        let request = ReleaseRequest::new(component.release_name, chart.path);
        self.runtime.install(&request).await?;

        Ok(version)
    }

    /// Upgrade to the newest tag. Returns the version now deployed.
    pub async fn update(&self, component: &Component) -> Result<String> {
        let installed = self.installed_version(component).await?;
        let available = self.available_version(component).await?;

        if !is_update_available(&installed, &available) {
            return Err(CosmoError::AlreadyCurrent { version: available });
        }

        info!(
            chart = component.chart_name,
            from = %installed,
            to = %available,
            "Upgrading chart"
        );

        let workdir = TempDir::new()?;
        let chart = self
            .prepare_chart(component, &available, workdir.path())
            .await?;
        let request = ReleaseRequest::new(component.release_name, chart.path);
        self.runtime.upgrade(&request).await?;

        Ok(available)
    }

    /// Remove the release. `force` must be set by the caller.
    pub async fn uninstall(&self, component: &Component, force: bool) -> Result<()> {
        if !force {
            return Err(CosmoError::ForceFlagRequired {
                release: component.release_name.to_string(),
            });
        }

        info!(release = component.release_name, "Uninstalling release");
        self.runtime.uninstall(component.release_name).await
    }

    /// Versions for display. A missing release is reported, not raised.
    pub async fn report(&self, component: &Component) -> Result<ChartRelease> {
        let installed_version = match self.installed_version(component).await {
            Ok(version) => Some(version),
            Err(CosmoError::ReleaseNotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        let available_version = self.available_version(component).await?;

        Ok(ChartRelease {
            component: *component,
            installed_version,
            available_version,
        })
    }

    /// Pull the chart at `version` into `workdir` and make sure every
    /// declared dependency is vendored.
    async fn prepare_chart(
        &self,
        component: &Component,
        version: &str,
        workdir: &Path,
    ) -> Result<LoadedChart> {
        let path = self
            .runtime
            .pull_chart(&component.chart_reference(), version, workdir)
            .await?;
        let chart = LoadedChart::load(&path)?;

        if chart.missing_dependencies().is_empty() {
            return Ok(chart);
        }

        debug!(chart = %chart.metadata.name, "Downloading chart dependencies");
        self.runtime.update_dependencies(&path).await?;

        let chart = LoadedChart::load(&path)?;
        let missing: Vec<&str> = chart
            .missing_dependencies()
            .into_iter()
            .map(|dep| dep.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(CosmoError::DependencyResolutionFailed(format!(
                "{} still missing after dependency update: {}",
                chart.metadata.name,
                missing.join(", ")
            )));
        }

        Ok(chart)
    }
}
