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

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::Pod;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
    use kubectl_cosmo::domain::console::{
        wait_for_newline, PodRef, PortRange, TunnelSession, TunnelSpec, TunnelState,
    };
    use kubectl_cosmo::infrastructure::kubernetes::PodConnection;
    use kubectl_cosmo::infrastructure::BrowserOpener;
    use kubectl_cosmo::*;
    use std::collections::BTreeMap;
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct FakeKube {
        deployment: Option<Deployment>,
        pods: Vec<Pod>,
        deployment_gets: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CosmoKubeClient for FakeKube {
        async fn get_deployment(&self, name: &str) -> Result<Deployment> {
            self.deployment_gets.fetch_add(1, Ordering::SeqCst);
            self.deployment
                .clone()
                .ok_or_else(|| CosmoError::deployment_not_found(name, "cosmonic-system"))
        }

        async fn get_pods_with_labels(&self, label_selector: &str) -> Result<Vec<Pod>> {
            assert_eq!(label_selector, "app=console");
            Ok(self.pods.clone())
        }
    }

    fn console_deployment(ready_replicas: i32) -> Deployment {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "console".to_string());

        let mut deployment = Deployment::default();
        deployment.metadata.name = Some("console".to_string());
        deployment.metadata.namespace = Some("cosmonic-system".to_string());
        deployment.spec = Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(labels),
                ..Default::default()
            },
            ..Default::default()
        });
        deployment.status = Some(DeploymentStatus {
            ready_replicas: Some(ready_replicas),
            ..Default::default()
        });
        deployment
    }

    fn console_pod(name: &str) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some(name.to_string());
        pod
    }

    fn healthy_cluster() -> FakeKube {
        FakeKube {
            deployment: Some(console_deployment(1)),
            pods: vec![console_pod("console-7d9f-abcde")],
            ..Default::default()
        }
    }

    /// Serves every dial with an in-memory echo server; dials past
    /// `fail_after` are refused.
    #[derive(Default)]
    struct EchoDialer {
        dials: AtomicUsize,
        fail_after: Option<usize>,
    }

    #[async_trait::async_trait]
    impl PortForwardDialer for EchoDialer {
        async fn dial(&self, pod: &str, port: u16) -> Result<PodConnection> {
            assert_eq!(port, 8080);
            let count = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_after.is_some_and(|limit| count > limit) {
                return Err(CosmoError::tunnel_upgrade(pod, "pod not found"));
            }

            let (client, server) = tokio::io::duplex(4096);
            tokio::spawn(async move {
                let (mut reader, mut writer) = tokio::io::split(server);
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
            Ok(PodConnection::detached(client))
        }
    }

    struct RefusingDialer;

    #[async_trait::async_trait]
    impl PortForwardDialer for RefusingDialer {
        async fn dial(&self, pod: &str, _port: u16) -> Result<PodConnection> {
            Err(CosmoError::tunnel_upgrade(pod, "403 Forbidden"))
        }
    }

    struct ChannelBrowser(mpsc::UnboundedSender<String>);

    impl BrowserOpener for ChannelBrowser {
        fn open(&self, url: &str) -> std::io::Result<()> {
            let _ = self.0.send(url.to_string());
            Ok(())
        }
    }

    /// A range starting at a port that is free right now
    fn test_port_range() -> PortRange {
        let probe = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
        let start = probe.local_addr().unwrap().port();
        drop(probe);
        PortRange::new(start, start.saturating_add(20))
    }

    fn port_of(url: &str) -> u16 {
        url.rsplit(':').next().unwrap().parse().unwrap()
    }

    type Outcome = JoinHandle<(Result<()>, String)>;

    fn launch(
        kube: FakeKube,
        dialer: Arc<dyn PortForwardDialer>,
        ports: PortRange,
    ) -> (Outcome, mpsc::UnboundedReceiver<String>, oneshot::Sender<()>) {
        let (url_tx, url_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let launcher = ConsoleLauncher::new(Arc::new(kube), dialer, Arc::new(ChannelBrowser(url_tx)))
            .with_port_range(ports);

        let handle = tokio::spawn(async move {
            let mut output = Vec::new();
            let confirm = wait_for_newline(&b"\n"[..]);
            let shutdown = async {
                let _ = stop_rx.await;
            };
            let result = launcher.run(&mut output, confirm, shutdown).await;
            (result, String::from_utf8(output).unwrap())
        });

        (handle, url_rx, stop_tx)
    }

    async fn assert_echo(port: u16) {
        assert_echo_at(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await;
    }

    async fn assert_echo_at(addr: SocketAddr) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_console_happy_path() {
        let ports = test_port_range();
        let (handle, mut urls, stop) = launch(healthy_cluster(), Arc::new(EchoDialer::default()), ports);

        let url = urls.recv().await.unwrap();
        let port = port_of(&url);
        assert!(ports.contains(port));
        assert_eq!(url, format!("http://localhost:{}", port));

        assert_echo(port).await;
        assert_echo(port).await;

        stop.send(()).unwrap();
        let (result, output) = handle.await.unwrap();
        result.unwrap();
        assert!(output.contains(&format!(
            "Press enter to connect to the console at {}\nCtrl+C when finished",
            url
        )));

        // Listener is released on shutdown
        std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
    }

    #[tokio::test]
    async fn test_console_skips_busy_port() {
        let ports = test_port_range();
        let _busy = std::net::TcpListener::bind(("0.0.0.0", ports.start)).unwrap();

        let (handle, mut urls, stop) = launch(healthy_cluster(), Arc::new(EchoDialer::default()), ports);

        let port = port_of(&urls.recv().await.unwrap());
        assert!(port > ports.start);
        assert!(ports.contains(port));

        stop.send(()).unwrap();
        handle.await.unwrap().0.unwrap();
    }

    #[tokio::test]
    async fn test_console_deployment_absent() {
        let kube = FakeKube::default();
        let (handle, mut urls, _stop) = launch(kube, Arc::new(EchoDialer::default()), test_port_range());

        let (result, output) = handle.await.unwrap();
        assert!(matches!(result, Err(CosmoError::DeploymentNotFound { .. })));
        assert!(output.is_empty());
        assert!(urls.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_console_not_ready() {
        let kube = FakeKube {
            deployment: Some(console_deployment(0)),
            pods: vec![console_pod("console-7d9f-abcde")],
            ..Default::default()
        };
        let (handle, _urls, _stop) = launch(kube, Arc::new(EchoDialer::default()), test_port_range());

        let (result, _) = handle.await.unwrap();
        assert!(matches!(result, Err(CosmoError::ConsoleNotReady { .. })));
    }

    #[tokio::test]
    async fn test_console_without_pods() {
        let kube = FakeKube {
            deployment: Some(console_deployment(1)),
            ..Default::default()
        };
        let (handle, _urls, _stop) = launch(kube, Arc::new(EchoDialer::default()), test_port_range());

        let (result, _) = handle.await.unwrap();
        assert!(matches!(result, Err(CosmoError::NoPodsForDeployment { .. })));
    }

    #[tokio::test]
    async fn test_console_upgrade_refused() {
        let (handle, mut urls, _stop) = launch(healthy_cluster(), Arc::new(RefusingDialer), test_port_range());

        let (result, output) = handle.await.unwrap();
        let err = result.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("error with starting port forwarding, error: "));
        assert!(err.to_string().contains("403 Forbidden"));
        assert!(output.is_empty());
        assert!(urls.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_console_pod_lost_after_ready() {
        let dialer = EchoDialer {
            fail_after: Some(1),
            ..Default::default()
        };
        let (handle, mut urls, _stop) = launch(healthy_cluster(), Arc::new(dialer), test_port_range());

        let port = port_of(&urls.recv().await.unwrap());
        let _stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        let (result, _) = handle.await.unwrap();
        assert!(matches!(result, Err(CosmoError::TunnelStreamFailed(_))));
    }

    #[tokio::test]
    async fn test_shutdown_before_confirmation() {
        let (url_tx, mut urls) = mpsc::unbounded_channel();
        let launcher = ConsoleLauncher::new(
            Arc::new(healthy_cluster()),
            Arc::new(EchoDialer::default()),
            Arc::new(ChannelBrowser(url_tx)),
        )
        .with_port_range(test_port_range());

        let mut output = Vec::new();
        let confirm = std::future::pending::<std::io::Result<()>>();
        launcher.run(&mut output, confirm, async {}).await.unwrap();

        assert!(String::from_utf8(output).unwrap().starts_with("Press enter"));
        assert!(urls.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_console_fetches_deployment_once() {
        let kube = Arc::new(healthy_cluster());
        let (url_tx, _urls) = mpsc::unbounded_channel();
        let launcher = ConsoleLauncher::new(
            kube.clone(),
            Arc::new(EchoDialer::default()),
            Arc::new(ChannelBrowser(url_tx)),
        )
        .with_port_range(test_port_range());

        let mut output = Vec::new();
        let confirm = std::future::pending::<std::io::Result<()>>();
        launcher.run(&mut output, confirm, async {}).await.unwrap();

        assert_eq!(kube.deployment_gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tunnel_session_states() {
        let spec = TunnelSpec {
            pod: PodRef {
                namespace: "cosmonic-system".to_string(),
                name: "console-7d9f-abcde".to_string(),
            },
            local_port: 0,
            remote_port: 8080,
        };
        let parent = CancellationToken::new();
        let mut session = TunnelSession::spawn(Arc::new(EchoDialer::default()), spec, &parent);

        let addr = session.wait_ready().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(session.state(), TunnelState::Ready);
        assert_echo(addr.port()).await;

        parent.cancel();
        session.wait().await.unwrap();
        assert_eq!(session.state(), TunnelState::Terminated);
    }

    #[tokio::test]
    async fn test_tunnel_listens_on_both_loopbacks() {
        // Hosts without an IPv6 loopback only get the IPv4 listener
        if std::net::TcpListener::bind((Ipv6Addr::LOCALHOST, 0)).is_err() {
            return;
        }

        let spec = TunnelSpec {
            pod: PodRef {
                namespace: "cosmonic-system".to_string(),
                name: "console-7d9f-abcde".to_string(),
            },
            local_port: 0,
            remote_port: 8080,
        };
        let parent = CancellationToken::new();
        let mut session = TunnelSession::spawn(Arc::new(EchoDialer::default()), spec, &parent);

        let addr = session.wait_ready().await.unwrap();
        assert_echo_at(SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()))).await;
        assert_echo_at(SocketAddr::from((Ipv6Addr::LOCALHOST, addr.port()))).await;

        session.stop();
        session.wait().await.unwrap();
        assert!(TcpStream::connect((Ipv6Addr::LOCALHOST, addr.port())).await.is_err());
    }
}
