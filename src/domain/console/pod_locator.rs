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

use crate::infrastructure::constants::{
    CONSOLE_CONTAINER_PORT, CONSOLE_DEPLOYMENT, COSMONIC_NAMESPACE,
};
use crate::infrastructure::kubernetes::CosmoKubeClient;
use crate::shared::error::{CosmoError, Result};
use k8s_openapi::api::apps::v1::Deployment;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// A deployment and the container port the tool talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    pub namespace: String,
    pub deployment_name: String,
    pub container_port: u16,
}

impl WorkloadRef {
    pub fn console() -> Self {
        Self {
            namespace: COSMONIC_NAMESPACE.to_string(),
            deployment_name: CONSOLE_DEPLOYMENT.to_string(),
            container_port: CONSOLE_CONTAINER_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Conjunction of `key=value` terms, in key order
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Fail unless the deployment reports at least one ready replica.
pub fn ensure_ready(deployment: &Deployment) -> Result<()> {
    let ready = deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);

    if ready >= 1 {
        Ok(())
    } else {
        Err(CosmoError::ConsoleNotReady {
            name: deployment.metadata.name.clone().unwrap_or_default(),
            namespace: deployment.metadata.namespace.clone().unwrap_or_default(),
        })
    }
}

/// Find the pod backing an already fetched deployment.
///
/// The first pod of the label-selector listing wins; readiness, phase and
/// age are not considered.
pub async fn find_pod(
    client: &dyn CosmoKubeClient,
    workload: &WorkloadRef,
    deployment: &Deployment,
) -> Result<PodRef> {
    let match_labels = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.match_labels.clone())
        .unwrap_or_default();

    let no_pods = || CosmoError::NoPodsForDeployment {
        name: workload.deployment_name.clone(),
        namespace: workload.namespace.clone(),
    };

    if match_labels.is_empty() {
        return Err(no_pods());
    }

    let selector = label_selector(&match_labels);
    debug!(deployment = %workload.deployment_name, %selector, "Listing pods for deployment");

    let pods = client.get_pods_with_labels(&selector).await?;
    let name = pods
        .into_iter()
        .find_map(|pod| pod.metadata.name)
        .ok_or_else(no_pods)?;

    Ok(PodRef {
        namespace: workload.namespace.clone(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::Pod;

    struct ListOnly(Vec<&'static str>);

    #[async_trait::async_trait]
    impl CosmoKubeClient for ListOnly {
        async fn get_deployment(&self, name: &str) -> Result<Deployment> {
            panic!("deployment {} fetched again", name);
        }

        async fn get_pods_with_labels(&self, label_selector: &str) -> Result<Vec<Pod>> {
            assert_eq!(label_selector, "app=console");
            Ok(self
                .0
                .iter()
                .map(|name| {
                    let mut pod = Pod::default();
                    pod.metadata.name = Some(name.to_string());
                    pod
                })
                .collect())
        }
    }

    fn selected_deployment() -> Deployment {
        let mut deployment = Deployment::default();
        deployment.spec = Some(DeploymentSpec {
            selector: k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector {
                match_labels: Some(BTreeMap::from([("app".to_string(), "console".to_string())])),
                ..Default::default()
            },
            ..Default::default()
        });
        deployment
    }

    #[tokio::test]
    async fn test_find_pod_uses_fetched_deployment() {
        let client = ListOnly(vec!["console-a", "console-b"]);
        let pod = find_pod(&client, &WorkloadRef::console(), &selected_deployment())
            .await
            .unwrap();
        assert_eq!(pod.to_string(), "cosmonic-system/console-a");
    }

    #[tokio::test]
    async fn test_find_pod_without_selector() {
        let client = ListOnly(vec!["console-a"]);
        let err = find_pod(&client, &WorkloadRef::console(), &Deployment::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CosmoError::NoPodsForDeployment { .. }));
    }

    #[test]
    fn test_label_selector_is_sorted_conjunction() {
        let mut labels = BTreeMap::new();
        labels.insert("component".to_string(), "ui".to_string());
        labels.insert("app".to_string(), "console".to_string());
        assert_eq!(label_selector(&labels), "app=console,component=ui");
    }

    #[test]
    fn test_ensure_ready() {
        let mut deployment = Deployment::default();
        deployment.metadata.name = Some("console".to_string());
        assert!(matches!(
            ensure_ready(&deployment),
            Err(CosmoError::ConsoleNotReady { .. })
        ));

        deployment.status = Some(DeploymentStatus {
            ready_replicas: Some(0),
            ..Default::default()
        });
        assert!(ensure_ready(&deployment).is_err());

        deployment.status = Some(DeploymentStatus {
            ready_replicas: Some(2),
            ..Default::default()
        });
        assert!(ensure_ready(&deployment).is_ok());
    }

    #[test]
    fn test_console_workload() {
        let workload = WorkloadRef::console();
        assert_eq!(workload.namespace, "cosmonic-system");
        assert_eq!(workload.deployment_name, "console");
        assert_eq!(workload.container_port, 8080);
    }
}
