//! The `console` command

use super::commands::GlobalArgs;
use crate::domain::console::{stdin_newline, ConsoleLauncher, WorkloadRef};
use crate::domain::EffectiveContext;
use crate::infrastructure::kubernetes::{CosmoKubeClientImpl, KubePortForwardDialer};
use crate::infrastructure::SystemBrowser;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Parser, Debug, Clone)]
pub struct ConsoleCommand {}

impl ConsoleCommand {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let context = EffectiveContext::load(&global.context_overrides()).await?;
        debug!(
            context = %context.name(),
            server = %context.api_server_url(),
            default_namespace = %context.namespace(),
            "Using kube context"
        );

        let client = context.client()?;
        let workload = WorkloadRef::console();
        let launcher = ConsoleLauncher::new(
            Arc::new(CosmoKubeClientImpl::new(client.clone(), &workload.namespace)),
            Arc::new(KubePortForwardDialer::new(client, &workload.namespace)),
            Arc::new(SystemBrowser),
        )
        .with_workload(workload);

        let mut stdout = std::io::stdout();
        launcher
            .run(&mut stdout, stdin_newline(), shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => debug!("Received Ctrl+C"),
        _ = terminate => debug!("Received SIGTERM"),
    }
}
