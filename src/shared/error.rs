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

use thiserror::Error;
pub type Result<T> = std::result::Result<T, CosmoError>;

#[derive(Error, Debug)]
pub enum CosmoError {
    #[error("no context is currently set, use \"kubectl config use-context <context>\" to select a new one")]
    NoContextSelected,

    #[error("Kubeconfig error: {0}")]
    KubeConfig(String),

    #[error("Kubernetes API error: {0}")]
    Kube(String),

    #[error("deployment '{name}' not found in namespace '{namespace}'")]
    DeploymentNotFound { name: String, namespace: String },

    #[error("console deployment '{name}' in namespace '{namespace}' has no ready replicas")]
    ConsoleNotReady { name: String, namespace: String },

    #[error("no pod found for {name} deployment in namespace '{namespace}'")]
    NoPodsForDeployment { name: String, namespace: String },

    #[error("local port for port-forwarding not found in range {start}-{end}")]
    PortRangeExhausted { start: u16, end: u16 },

    #[error("context is already closed")]
    ContextClosed,

    #[error("failed to set up transport: {0}")]
    TransportSetupFailed(String),

    #[error("failed to upgrade connection to pod {pod}: {message}")]
    TunnelUpgradeFailed { pod: String, message: String },

    #[error("port-forward stream failed: {0}")]
    TunnelStreamFailed(String),

    #[error("error with starting port forwarding, error: {cause}")]
    TunnelStart { cause: Box<CosmoError> },

    #[error("release '{release}' not found")]
    ReleaseNotFound { release: String },

    #[error("chart {chart} is already installed (version {version})")]
    AlreadyInstalled { chart: String, version: String },

    #[error("chart is already at the latest version {version}")]
    AlreadyCurrent { version: String },

    #[error("repository tag not found for {repository}")]
    NoTags { repository: String },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("failed to locate chart {reference}: {message}")]
    ChartLocateFailed { reference: String, message: String },

    #[error("failed to load chart: {0}")]
    ChartLoadFailed(String),

    #[error("failed to resolve chart dependencies: {0}")]
    DependencyResolutionFailed(String),

    #[error("install of {release} failed: {message}")]
    InstallFailed { release: String, message: String },

    #[error("upgrade of {release} failed: {message}")]
    UpgradeFailed { release: String, message: String },

    #[error("uninstall of {release} failed: {message}")]
    UninstallFailed { release: String, message: String },

    #[error("uninstalling {release} requires the --force flag")]
    ForceFlagRequired { release: String },

    #[error("failed to run helm {action}: {message}")]
    Helm { action: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<kube::Error> for CosmoError {
    fn from(err: kube::Error) -> Self {
        CosmoError::Kube(err.to_string())
    }
}

impl CosmoError {
    pub fn deployment_not_found(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::DeploymentNotFound {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn tunnel_upgrade(pod: impl Into<String>, message: impl ToString) -> Self {
        Self::TunnelUpgradeFailed {
            pod: pod.into(),
            message: message.to_string(),
        }
    }

    pub fn tunnel_start(source: CosmoError) -> Self {
        Self::TunnelStart {
            cause: Box::new(source),
        }
    }

    pub fn helm(action: impl Into<String>, message: impl ToString) -> Self {
        Self::Helm {
            action: action.into(),
            message: message.to_string(),
        }
    }
}
