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

use crate::shared::error::CosmoError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};

#[async_trait::async_trait]
pub trait CosmoKubeClient: Send + Sync {
    async fn get_deployment(&self, name: &str) -> Result<Deployment, CosmoError>;

    async fn get_pods_with_labels(&self, label_selector: &str) -> Result<Vec<Pod>, CosmoError>;
}

pub struct CosmoKubeClientImpl {
    client: Client,
    namespace: String,
}

impl CosmoKubeClientImpl {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

#[async_trait::async_trait]
impl CosmoKubeClient for CosmoKubeClientImpl {
    async fn get_deployment(&self, name: &str) -> Result<Deployment, CosmoError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        api.get(name).await.map_err(|e| {
            if let kube::Error::Api(ae) = e {
                if ae.code == 404 {
                    CosmoError::deployment_not_found(name, &self.namespace)
                } else {
                    CosmoError::Kube(ae.message)
                }
            } else {
                CosmoError::Kube(e.to_string())
            }
        })
    }

    async fn get_pods_with_labels(&self, label_selector: &str) -> Result<Vec<Pod>, CosmoError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let lp = kube::api::ListParams::default().labels(label_selector);

        let pods = api.list(&lp).await?;
        Ok(pods.items)
    }
}
