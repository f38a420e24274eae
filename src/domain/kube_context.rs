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

//! Resolution of the operator's effective Kubernetes context.
//!
//! The kubeconfig is read once per invocation (explicit path, or the standard
//! `KUBECONFIG` / `~/.kube/config` discovery), flag overrides are applied, and
//! the result is an immutable [`EffectiveContext`] handed by reference to the
//! console engine and the chart coordinator.

use crate::shared::error::{CosmoError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_NAMESPACE: &str = "default";

/// Flag-supplied selectors layered over the on-disk kubeconfig
#[derive(Debug, Clone, Default)]
pub struct ContextOverrides {
    pub kubeconfig: Option<PathBuf>,
    pub cluster: Option<String>,
    pub context: Option<String>,
    pub auth_info: Option<String>,
    pub namespace: Option<String>,
}

impl ContextOverrides {
    fn cluster(&self) -> Option<&str> {
        non_empty(&self.cluster)
    }

    fn context(&self) -> Option<&str> {
        non_empty(&self.context)
    }

    fn auth_info(&self) -> Option<&str> {
        non_empty(&self.auth_info)
    }

    fn namespace(&self) -> Option<&str> {
        non_empty(&self.namespace)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// The context entry that results from applying overrides to the kubeconfig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    /// Display name; synthesized unless a context was named explicitly
    pub name: String,
    pub cluster: String,
    pub auth_info: String,
    pub namespace: Option<String>,
}

/// Apply overrides to the kubeconfig's current context.
pub fn resolve_context(
    kubeconfig: &Kubeconfig,
    overrides: &ContextOverrides,
) -> Result<ResolvedContext> {
    let current_name = kubeconfig
        .current_context
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(CosmoError::NoContextSelected)?;

    let current = kubeconfig
        .contexts
        .iter()
        .find(|named| named.name == current_name)
        .and_then(|named| named.context.as_ref())
        .ok_or(CosmoError::NoContextSelected)?;

    let mut resolved = ResolvedContext {
        name: String::new(),
        cluster: current.cluster.clone(),
        auth_info: current.user.clone(),
        namespace: current.namespace.clone(),
    };

    if let Some(requested) = overrides.context() {
        resolved.name = requested.to_string();
        let entry = kubeconfig
            .contexts
            .iter()
            .find(|named| named.name == requested)
            .and_then(|named| named.context.as_ref());
        if let Some(entry) = entry {
            resolved.cluster = entry.cluster.clone();
            resolved.auth_info = entry.user.clone();
            resolved.namespace = entry.namespace.clone();
        }
    }

    if let Some(cluster) = overrides.cluster() {
        resolved.cluster = cluster.to_string();
    }
    if let Some(auth_info) = overrides.auth_info() {
        resolved.auth_info = auth_info.to_string();
    }
    if let Some(namespace) = overrides.namespace() {
        resolved.namespace = Some(namespace.to_string());
    }

    if overrides.context().is_none() {
        resolved.name = generate_context_name(&resolved);
    }

    Ok(resolved)
}

/// `{namespace}/{cluster}/{authInfoHead}` where the auth-info head is the part
/// before the first `/`.
pub fn generate_context_name(context: &ResolvedContext) -> String {
    let namespace = context.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    let auth_head = context.auth_info.split('/').next().unwrap_or_default();
    format!("{}/{}/{}", namespace, context.cluster, auth_head)
}

/// Cluster access for a single command invocation
#[derive(Clone)]
pub struct EffectiveContext {
    resolved: ResolvedContext,
    config: kube::Config,
}

impl std::fmt::Debug for EffectiveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectiveContext")
            .field("resolved", &self.resolved)
            .field("api_server_url", &self.api_server_url())
            .finish()
    }
}

impl EffectiveContext {
    pub async fn load(overrides: &ContextOverrides) -> Result<Self> {
        let kubeconfig = match &overrides.kubeconfig {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        }
        .map_err(|e| CosmoError::KubeConfig(format!("Failed to load kubeconfig: {}", e)))?;

        Self::from_kubeconfig(kubeconfig, overrides).await
    }

    pub async fn from_kubeconfig(
        kubeconfig: Kubeconfig,
        overrides: &ContextOverrides,
    ) -> Result<Self> {
        let resolved = resolve_context(&kubeconfig, overrides)?;
        info!(context = %resolved.name, cluster = %resolved.cluster, "Resolved kube context");

        let options = KubeConfigOptions {
            context: overrides.context().map(str::to_string),
            cluster: overrides.cluster().map(str::to_string),
            user: overrides.auth_info().map(str::to_string),
        };

        let mut config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| {
                CosmoError::KubeConfig(format!("Failed to create Kubernetes config: {}", e))
            })?;

        if let Some(namespace) = &resolved.namespace {
            config.default_namespace = namespace.clone();
        }

        if config.cluster_url.host().unwrap_or_default().is_empty() {
            return Err(CosmoError::TransportSetupFailed(format!(
                "cluster '{}' has no API server address",
                resolved.cluster
            )));
        }
        if config.cluster_url.scheme_str() != Some("https") {
            warn!(url = %config.cluster_url, "API server is not served over HTTPS");
        }

        Ok(Self { resolved, config })
    }

    pub fn name(&self) -> &str {
        &self.resolved.name
    }

    pub fn namespace(&self) -> &str {
        &self.config.default_namespace
    }

    pub fn api_server_url(&self) -> String {
        self.config.cluster_url.to_string()
    }

    pub fn client(&self) -> Result<Client> {
        Client::try_from(self.config.clone()).map_err(|e| {
            CosmoError::TransportSetupFailed(format!("Failed to create Kubernetes client: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: dev-cluster
    cluster:
      server: https://127.0.0.1:6443
      insecure-skip-tls-verify: true
  - name: prod-cluster
    cluster:
      server: https://10.0.0.1:6443
      insecure-skip-tls-verify: true
users:
  - name: alice/dev-cluster
    user:
      token: dev-token
  - name: bob
    user:
      token: prod-token
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: alice/dev-cluster
      namespace: apps
  - name: prod
    context:
      cluster: prod-cluster
      user: bob
"#;

    fn kubeconfig() -> Kubeconfig {
        Kubeconfig::from_yaml(KUBECONFIG).expect("valid kubeconfig")
    }

    #[test]
    fn test_synthesized_name_from_current_context() {
        let resolved = resolve_context(&kubeconfig(), &ContextOverrides::default()).unwrap();
        assert_eq!(resolved.name, "apps/dev-cluster/alice");
        assert_eq!(resolved.name.matches('/').count(), 2);
        assert_eq!(resolved.cluster, "dev-cluster");
        assert_eq!(resolved.auth_info, "alice/dev-cluster");
    }

    #[test]
    fn test_explicit_context_adopts_its_name() {
        let overrides = ContextOverrides {
            context: Some("prod".to_string()),
            ..Default::default()
        };
        let resolved = resolve_context(&kubeconfig(), &overrides).unwrap();
        assert_eq!(resolved.name, "prod");
        assert_eq!(resolved.cluster, "prod-cluster");
        assert_eq!(resolved.auth_info, "bob");
        assert_eq!(resolved.namespace, None);
    }

    #[test]
    fn test_cluster_and_user_overrides_apply_fieldwise() {
        let overrides = ContextOverrides {
            cluster: Some("prod-cluster".to_string()),
            auth_info: Some("bob".to_string()),
            namespace: Some("cosmonic-system".to_string()),
            ..Default::default()
        };
        let resolved = resolve_context(&kubeconfig(), &overrides).unwrap();
        assert_eq!(resolved.name, "cosmonic-system/prod-cluster/bob");
        assert!(resolved.name.starts_with("cosmonic-system/"));
    }

    #[test]
    fn test_empty_overrides_are_ignored() {
        let overrides = ContextOverrides {
            context: Some(String::new()),
            cluster: Some(String::new()),
            ..Default::default()
        };
        let resolved = resolve_context(&kubeconfig(), &overrides).unwrap();
        assert_eq!(resolved.name, "apps/dev-cluster/alice");
    }

    #[test]
    fn test_missing_current_context_fails() {
        let mut config = kubeconfig();
        config.current_context = Some(String::new());
        let err = resolve_context(&config, &ContextOverrides::default()).unwrap_err();
        assert!(matches!(err, CosmoError::NoContextSelected));

        config.current_context = None;
        let err = resolve_context(&config, &ContextOverrides::default()).unwrap_err();
        assert!(matches!(err, CosmoError::NoContextSelected));
    }

    #[test]
    fn test_unknown_current_context_fails() {
        let mut config = kubeconfig();
        config.current_context = Some("gone".to_string());
        let err = resolve_context(&config, &ContextOverrides::default()).unwrap_err();
        assert!(matches!(err, CosmoError::NoContextSelected));
    }

    #[tokio::test]
    async fn test_effective_context_from_kubeconfig() {
        let overrides = ContextOverrides {
            namespace: Some("cosmonic-system".to_string()),
            ..Default::default()
        };
        let context = EffectiveContext::from_kubeconfig(kubeconfig(), &overrides)
            .await
            .unwrap();
        assert_eq!(context.namespace(), "cosmonic-system");
        assert!(context.api_server_url().starts_with("https://127.0.0.1:6443"));
        assert_eq!(context.name(), "cosmonic-system/dev-cluster/alice");
    }
}
