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

use super::pod_locator::{ensure_ready, find_pod, WorkloadRef};
use super::port_picker::{pick_port, PortRange};
use super::tunnel::{TunnelSession, TunnelSpec};
use crate::infrastructure::browser::BrowserOpener;
use crate::infrastructure::kubernetes::{CosmoKubeClient, PortForwardDialer};
use crate::shared::error::{CosmoError, Result};
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Opens the Cosmonic console through a local port-forward.
pub struct ConsoleLauncher {
    client: Arc<dyn CosmoKubeClient>,
    dialer: Arc<dyn PortForwardDialer>,
    browser: Arc<dyn BrowserOpener>,
    ports: PortRange,
    workload: WorkloadRef,
}

impl ConsoleLauncher {
    pub fn new(
        client: Arc<dyn CosmoKubeClient>,
        dialer: Arc<dyn PortForwardDialer>,
        browser: Arc<dyn BrowserOpener>,
    ) -> Self {
        Self {
            client,
            dialer,
            browser,
            ports: PortRange::default(),
            workload: WorkloadRef::console(),
        }
    }

    pub fn with_port_range(mut self, ports: PortRange) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_workload(mut self, workload: WorkloadRef) -> Self {
        self.workload = workload;
        self
    }

    /// Run the console session until `shutdown` resolves.
    ///
    /// The prompt goes to `output`; `confirm` resolves when the operator has
    /// pressed enter (or input is exhausted), after which the browser is
    /// pointed at the tunnel.
    pub async fn run<W, C, S>(&self, output: &mut W, confirm: C, shutdown: S) -> Result<()>
    where
        W: Write,
        C: Future<Output = io::Result<()>>,
        S: Future<Output = ()>,
    {
        let deployment = self
            .client
            .get_deployment(&self.workload.deployment_name)
            .await?;
        ensure_ready(&deployment)?;

        let pod = find_pod(self.client.as_ref(), &self.workload, &deployment).await?;
        let local_port = pick_port(self.ports)?;
        debug!(%pod, local_port, "Selected pod and local port");

        let spec = TunnelSpec {
            pod,
            local_port,
            remote_port: self.workload.container_port,
        };

        let stop = CancellationToken::new();
        let mut session = TunnelSession::spawn(self.dialer.clone(), spec, &stop);
        session
            .wait_ready()
            .await
            .map_err(CosmoError::tunnel_start)?;

        let url = format!("http://localhost:{}", local_port);
        writeln!(
            output,
            "Press enter to connect to the console at {}\nCtrl+C when finished",
            url
        )?;
        output.flush()?;

        tokio::pin!(confirm);
        tokio::pin!(shutdown);

        tokio::select! {
            _ = &mut shutdown => return close(session).await,
            result = session.wait() => return result,
            read = &mut confirm => {
                if let Err(e) = read {
                    debug!(error = %e, "Failed to read confirmation");
                }
            }
        }

        info!(%url, "Opening console");
        if let Err(e) = self.browser.open(&url) {
            warn!(%url, error = %e, "Failed to open browser");
            eprintln!("Unable to open a browser, visit {} to reach the console", url);
        }

        tokio::select! {
            _ = &mut shutdown => close(session).await,
            result = session.wait() => result,
        }
    }
}

async fn close(mut session: TunnelSession) -> Result<()> {
    debug!(mapping = %session.spec().mapping(), "Stopping port-forward");
    session.stop();
    session.wait().await
}

/// Resolve once a full line (or end of input) has been read.
pub async fn wait_for_newline<R>(mut reader: R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(())
}

/// Wait for enter on the process's standard input.
///
/// The read happens on a detached thread so a pending read never holds up
/// process exit.
pub async fn stdin_newline() -> io::Result<()> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = tx.send(io::stdin().read_line(&mut line).map(|_| ()));
    });

    rx.await
        .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin reader exited")))
}
