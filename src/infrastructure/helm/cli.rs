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

//! [`ReleaseRuntime`] backed by the `helm` binary.

use super::runtime::{ReleaseRecord, ReleaseRequest, ReleaseRuntime};
use crate::infrastructure::constants::{
    COSMONIC_NAMESPACE, DEFAULT_HELM_BINARY, DELETION_PROPAGATION_FOREGROUND,
};
use crate::shared::error::{CosmoError, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HelmSettings {
    pub binary: PathBuf,
    /// Release storage backend (`HELM_DRIVER`); empty means helm's default
    pub driver: Option<String>,
    pub namespace: String,
    pub kube_context: Option<String>,
    pub kubeconfig: Option<PathBuf>,
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_HELM_BINARY),
            driver: None,
            namespace: COSMONIC_NAMESPACE.to_string(),
            kube_context: None,
            kubeconfig: None,
        }
    }
}

pub struct HelmCli {
    settings: HelmSettings,
}

impl HelmCli {
    pub fn new(settings: HelmSettings) -> Self {
        Self { settings }
    }

    /// Flags appended to every invocation
    pub fn global_flags(&self) -> Vec<OsString> {
        let mut flags: Vec<OsString> = vec!["--namespace".into(), self.settings.namespace.clone().into()];
        if let Some(context) = self.settings.kube_context.as_ref().filter(|c| !c.is_empty()) {
            flags.push("--kube-context".into());
            flags.push(context.into());
        }
        if let Some(path) = &self.settings.kubeconfig {
            flags.push("--kubeconfig".into());
            flags.push(path.into());
        }
        flags
    }

    async fn run<F>(&self, action: &str, args: Vec<OsString>, on_failure: F) -> Result<String>
    where
        F: FnOnce(String) -> CosmoError,
    {
        let mut command = Command::new(&self.settings.binary);
        command.args(&args).args(self.global_flags());
        if let Some(driver) = self.settings.driver.as_ref().filter(|d| !d.is_empty()) {
            command.env("HELM_DRIVER", driver);
        }

        debug!(binary = %self.settings.binary.display(), ?args, "Running helm {}", action);
        let output = command
            .output()
            .await
            .map_err(|e| CosmoError::helm(action, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("helm {} exited with {}", action, output.status)
            } else {
                stderr
            };
            return Err(on_failure(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn apply(&self, verb: &str, request: &ReleaseRequest, extra: &[&str]) -> Result<()> {
        let mut args: Vec<OsString> = vec![
            verb.into(),
            request.release_name.clone().into(),
            request.chart_path.clone().into(),
        ];
        args.extend(extra.iter().map(OsString::from));

        // Held until helm exits.
        let values_file = write_values(request)?;
        if let Some(file) = &values_file {
            args.push("-f".into());
            args.push(file.path().into());
        }

        let release = request.release_name.clone();
        self.run(verb, args, |message| match verb {
            "install" => CosmoError::InstallFailed { release, message },
            _ => CosmoError::UpgradeFailed { release, message },
        })
        .await?;
        Ok(())
    }
}

fn write_values(request: &ReleaseRequest) -> Result<Option<NamedTempFile>> {
    if request.values.is_empty() {
        return Ok(None);
    }

    let mut file = tempfile::Builder::new()
        .prefix("cosmo-values-")
        .suffix(".yaml")
        .tempfile()?;
    let yaml = serde_yaml::to_string(&request.values)?;
    file.write_all(yaml.as_bytes())?;
    file.flush()?;
    Ok(Some(file))
}

pub fn parse_release_list(stdout: &str) -> Result<Vec<ReleaseRecord>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[async_trait::async_trait]
impl ReleaseRuntime for HelmCli {
    async fn list_releases(&self, release: &str) -> Result<Vec<ReleaseRecord>> {
        let filter = format!("^{}$", regex::escape(release));
        let args: Vec<OsString> = vec![
            "list".into(),
            "--all".into(),
            "--filter".into(),
            filter.into(),
            "-o".into(),
            "json".into(),
        ];
        let stdout = self
            .run("list", args, |message| CosmoError::helm("list", message))
            .await?;
        parse_release_list(&stdout)
    }

    async fn pull_chart(&self, reference: &str, version: &str, dest: &Path) -> Result<PathBuf> {
        let args: Vec<OsString> = vec![
            "pull".into(),
            reference.into(),
            "--version".into(),
            version.into(),
            "--untar".into(),
            "--untardir".into(),
            dest.into(),
        ];
        self.run("pull", args, |message| CosmoError::ChartLocateFailed {
            reference: format!("{}:{}", reference, version),
            message,
        })
        .await?;

        let chart_name = reference.rsplit('/').next().unwrap_or(reference);
        Ok(dest.join(chart_name))
    }

    async fn update_dependencies(&self, chart_path: &Path) -> Result<()> {
        let args: Vec<OsString> = vec!["dependency".into(), "update".into(), chart_path.into()];
        self.run(
            "dependency update",
            args,
            CosmoError::DependencyResolutionFailed,
        )
        .await?;
        Ok(())
    }

    async fn install(&self, request: &ReleaseRequest) -> Result<()> {
        self.apply("install", request, &["--create-namespace"]).await
    }

    async fn upgrade(&self, request: &ReleaseRequest) -> Result<()> {
        self.apply("upgrade", request, &[]).await
    }

    async fn uninstall(&self, release: &str) -> Result<()> {
        let args: Vec<OsString> = vec![
            "uninstall".into(),
            release.into(),
            "--cascade".into(),
            DELETION_PROPAGATION_FOREGROUND.into(),
        ];
        let name = release.to_string();
        self.run("uninstall", args, |message| CosmoError::UninstallFailed {
            release: name,
            message,
        })
        .await?;
        Ok(())
    }
}
