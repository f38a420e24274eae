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

//! Upgraded streams to the pod `portforward` sub-resource.
//!
//! Every call to [`PortForwardDialer::dial`] performs one connection upgrade
//! against `/api/v1/namespaces/{ns}/pods/{pod}/portforward` and yields a
//! single bidirectional byte stream to the requested container port.

use crate::shared::error::CosmoError;
use futures::future::BoxFuture;
use futures::FutureExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

pub trait PodStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> PodStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// One upgraded stream plus the future that resolves once the upgrade is torn down
pub struct PodConnection {
    pub stream: Box<dyn PodStream>,
    pub completion: BoxFuture<'static, Result<(), CosmoError>>,
}

impl PodConnection {
    pub fn new<S, F>(stream: S, completion: F) -> Self
    where
        S: PodStream + 'static,
        F: Future<Output = Result<(), CosmoError>> + Send + 'static,
    {
        Self {
            stream: Box::new(stream),
            completion: completion.boxed(),
        }
    }

    /// A connection with nothing to wait for after the stream closes
    pub fn detached<S>(stream: S) -> Self
    where
        S: PodStream + 'static,
    {
        Self::new(stream, async { Ok(()) })
    }

    /// Close the stream and wait (bounded) for the upgrade to wind down.
    pub async fn release(self) {
        drop(self.stream);
        match tokio::time::timeout(RELEASE_TIMEOUT, self.completion).await {
            Ok(Ok(())) => debug!("Released port-forward stream"),
            Ok(Err(e)) => debug!(error = %e, "Port-forward stream ended with error"),
            Err(_) => debug!("Timed out releasing port-forward stream"),
        }
    }
}

#[async_trait::async_trait]
pub trait PortForwardDialer: Send + Sync {
    async fn dial(&self, pod: &str, port: u16) -> Result<PodConnection, CosmoError>;
}

/// Dials pods through the API server with kube-rs
pub struct KubePortForwardDialer {
    pods: Api<Pod>,
}

impl KubePortForwardDialer {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait::async_trait]
impl PortForwardDialer for KubePortForwardDialer {
    async fn dial(&self, pod: &str, port: u16) -> Result<PodConnection, CosmoError> {
        let mut forwarder = self
            .pods
            .portforward(pod, &[port])
            .await
            .map_err(|e| CosmoError::tunnel_upgrade(pod, e))?;

        let stream = forwarder
            .take_stream(port)
            .ok_or_else(|| CosmoError::tunnel_upgrade(pod, format!("no stream for port {}", port)))?;
        let remote_error = forwarder.take_error(port);

        let pod_name = pod.to_string();
        let completion = async move {
            if let Some(remote_error) = remote_error {
                if let Some(message) = remote_error.await {
                    warn!(pod = %pod_name, port, %message, "Pod reported port-forward error");
                }
            }
            forwarder
                .join()
                .await
                .map_err(|e| CosmoError::TunnelStreamFailed(e.to_string()))
        };

        Ok(PodConnection::new(stream, completion))
    }
}
