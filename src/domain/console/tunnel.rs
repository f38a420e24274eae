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

//! Local TCP listener multiplexed onto pod port-forward streams.
//!
//! A tunnel moves through [`TunnelState`]:
//!
//! ```text
//! Initializing -> Dialing -> Ready -> Closing -> Terminated
//!       \            \         \
//!        +------------+---------+--> Failed
//! ```
//!
//! Readiness is signalled once, after a probe upgrade has succeeded and the
//! local listener is accepting. The tunnel listens on `127.0.0.1` and, when
//! the host has an IPv6 loopback, on `[::1]` with the same port. Each accepted connection gets its own
//! upgraded stream to the pod.

use super::pod_locator::PodRef;
use crate::infrastructure::kubernetes::{PodConnection, PortForwardDialer};
use crate::shared::error::{CosmoError, Result};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Initializing,
    Dialing,
    Ready,
    Closing,
    Failed,
    Terminated,
}

impl TunnelState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TunnelState::Failed | TunnelState::Terminated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    pub pod: PodRef,
    pub local_port: u16,
    pub remote_port: u16,
}

impl TunnelSpec {
    /// `local:remote`, the notation kubectl uses for port mappings
    pub fn mapping(&self) -> String {
        format!("{}:{}", self.local_port, self.remote_port)
    }
}

/// A running tunnel owned by the console orchestrator
pub struct TunnelSession {
    spec: TunnelSpec,
    ready: Option<oneshot::Receiver<SocketAddr>>,
    stop: CancellationToken,
    state: watch::Receiver<TunnelState>,
    task: Option<JoinHandle<Result<()>>>,
}

impl TunnelSession {
    /// Start forwarding on a background task.
    ///
    /// The session stops when `parent` is cancelled, when [`stop`](Self::stop)
    /// is called, or when the session is dropped.
    pub fn spawn(
        dialer: Arc<dyn PortForwardDialer>,
        spec: TunnelSpec,
        parent: &CancellationToken,
    ) -> Self {
        let stop = parent.child_token();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(TunnelState::Initializing);

        let task = tokio::spawn(open_tunnel(
            dialer,
            spec.clone(),
            ready_tx,
            stop.clone(),
            state_tx,
        ));

        Self {
            spec,
            ready: Some(ready_rx),
            stop,
            state: state_rx,
            task: Some(task),
        }
    }

    pub fn spec(&self) -> &TunnelSpec {
        &self.spec
    }

    pub fn state(&self) -> TunnelState {
        *self.state.borrow()
    }

    /// Wait until the tunnel is accepting, or return the error that ended it
    /// first.
    pub async fn wait_ready(&mut self) -> Result<SocketAddr> {
        let ready = self.ready.take().ok_or_else(|| {
            CosmoError::TunnelStreamFailed("readiness was already awaited".to_string())
        })?;
        let Some(task) = self.task.as_mut() else {
            return Err(CosmoError::TunnelStreamFailed(
                "tunnel is not running".to_string(),
            ));
        };

        let outcome = tokio::select! {
            biased;
            addr = ready => Ok(addr),
            joined = task => Err(joined),
        };

        match outcome {
            Ok(Ok(addr)) => Ok(addr),
            // Sender dropped without signalling: the task is on its way out.
            Ok(Err(_)) => match self.task.take() {
                Some(task) => Err(not_ready(task.await)),
                None => Err(not_ready(Ok(Ok(())))),
            },
            Err(joined) => {
                self.task = None;
                Err(not_ready(joined))
            }
        }
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Wait for the forwarding task to finish. Safe to use inside `select!`.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let joined = task.await;
        self.task = None;
        flatten(joined)
    }
}

impl Drop for TunnelSession {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(CosmoError::TunnelStreamFailed(format!(
            "forwarding task aborted: {}",
            e
        ))),
    }
}

fn not_ready(joined: std::result::Result<Result<()>, JoinError>) -> CosmoError {
    match flatten(joined) {
        Err(e) => e,
        Ok(()) => CosmoError::TunnelStreamFailed("tunnel closed before becoming ready".to_string()),
    }
}

/// Run a tunnel to completion, publishing every state change.
pub async fn open_tunnel(
    dialer: Arc<dyn PortForwardDialer>,
    spec: TunnelSpec,
    ready: oneshot::Sender<SocketAddr>,
    stop: CancellationToken,
    state: watch::Sender<TunnelState>,
) -> Result<()> {
    let result = forward(dialer, &spec, ready, &stop, &state).await;

    match &result {
        Ok(()) => {
            state.send_replace(TunnelState::Terminated);
            info!(pod = %spec.pod, mapping = %spec.mapping(), "Port-forward terminated");
        }
        Err(e) => {
            state.send_replace(TunnelState::Failed);
            warn!(pod = %spec.pod, error = %e, "Port-forward failed");
        }
    }

    result
}

async fn forward(
    dialer: Arc<dyn PortForwardDialer>,
    spec: &TunnelSpec,
    ready: oneshot::Sender<SocketAddr>,
    stop: &CancellationToken,
    state: &watch::Sender<TunnelState>,
) -> Result<()> {
    if stop.is_cancelled() {
        return Err(CosmoError::ContextClosed);
    }

    state.send_replace(TunnelState::Dialing);
    debug!(pod = %spec.pod, mapping = %spec.mapping(), "Dialing pod port-forward");

    let probe = tokio::select! {
        _ = stop.cancelled() => return Err(CosmoError::ContextClosed),
        dialed = dialer.dial(&spec.pod.name, spec.remote_port) => dialed?,
    };
    probe.release().await;

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, spec.local_port))
        .await
        .map_err(|e| {
            CosmoError::TunnelStreamFailed(format!(
                "unable to listen on 127.0.0.1:{}: {}",
                spec.local_port, e
            ))
        })?;
    let local_addr = listener.local_addr()?;

    let ipv6 = match TcpListener::bind((Ipv6Addr::LOCALHOST, local_addr.port())).await {
        Ok(ipv6) => Some(ipv6),
        Err(e) => {
            debug!(port = local_addr.port(), error = %e, "Not listening on [::1]");
            None
        }
    };

    state.send_replace(TunnelState::Ready);
    info!(%local_addr, pod = %spec.pod, remote_port = spec.remote_port, "Forwarding");
    // The receiver may already be gone; the tunnel keeps serving regardless.
    let _ = ready.send(local_addr);

    let (failure_tx, mut failure_rx) = mpsc::channel::<CosmoError>(1);
    let mut connections = JoinSet::new();

    let outcome = loop {
        tokio::select! {
            _ = stop.cancelled() => break Ok(()),
            Some(err) = failure_rx.recv() => break Err(err),
            accepted = accept_either(&listener, ipv6.as_ref()) => match accepted {
                Ok((socket, peer)) => {
                    connections.spawn(serve_connection(
                        dialer.clone(),
                        spec.clone(),
                        socket,
                        peer,
                        failure_tx.clone(),
                    ));
                }
                Err(e) => {
                    break Err(CosmoError::TunnelStreamFailed(format!(
                        "failed to accept local connection: {}",
                        e
                    )))
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    };

    if outcome.is_ok() {
        state.send_replace(TunnelState::Closing);
        debug!(open = connections.len(), "Closing port-forward connections");
    }
    connections.shutdown().await;
    drop(listener);
    drop(ipv6);

    outcome
}

async fn accept_either(
    ipv4: &TcpListener,
    ipv6: Option<&TcpListener>,
) -> io::Result<(TcpStream, SocketAddr)> {
    match ipv6 {
        Some(ipv6) => tokio::select! {
            accepted = ipv4.accept() => accepted,
            accepted = ipv6.accept() => accepted,
        },
        None => ipv4.accept().await,
    }
}

async fn serve_connection(
    dialer: Arc<dyn PortForwardDialer>,
    spec: TunnelSpec,
    mut socket: TcpStream,
    peer: SocketAddr,
    failures: mpsc::Sender<CosmoError>,
) {
    debug!(%peer, "Handling connection for {}", spec.local_port);

    let PodConnection {
        mut stream,
        completion,
    } = match dialer.dial(&spec.pod.name, spec.remote_port).await {
        Ok(connection) => connection,
        Err(e) => {
            // The probe proved the transport works, so the pod side is gone.
            let _ = failures.try_send(CosmoError::TunnelStreamFailed(format!(
                "lost connection to pod {}: {}",
                spec.pod, e
            )));
            return;
        }
    };

    match tokio::io::copy_bidirectional(&mut socket, &mut stream).await {
        Ok((sent, received)) => debug!(%peer, sent, received, "Connection closed"),
        Err(e) => warn!(%peer, error = %e, "Error copying port-forward stream"),
    }

    drop(stream);
    if let Err(e) = completion.await {
        debug!(%peer, error = %e, "Port-forward stream ended with error");
    }
}
