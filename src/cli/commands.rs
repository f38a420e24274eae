// CLI command definitions

use super::charts::{ChartCommand, VersionCommand};
use super::console::ConsoleCommand;
use super::links::{DocsCommand, LicenseCommand};
use crate::domain::chart::{HOSTGROUP, NEXUS};
use crate::domain::ContextOverrides;
use crate::infrastructure::constants::{COSMONIC_NAMESPACE, DEFAULT_HELM_BINARY};
use crate::infrastructure::helm::HelmSettings;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "kubectl-cosmo",
    bin_name = "kubectl cosmo",
    version,
    about = "Interact with Cosmonic Control",
    long_about = "A kubectl plugin for opening the Cosmonic console and managing the Cosmonic Control charts"
)]
pub struct CliArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to kubeconfig file
    /// If not specified, uses default kubeconfig resolution (KUBECONFIG env or ~/.kube/config)
    #[arg(long, global = true, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubernetes context to use
    /// If not specified, uses current context from kubeconfig
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Kubeconfig cluster to use
    #[arg(long, global = true)]
    pub cluster: Option<String>,

    /// Kubeconfig user to use
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Namespace recorded in the resolved context
    #[arg(long, short = 'n', global = true)]
    pub namespace: Option<String>,

    /// Helm release storage driver (secret, configmap, memory, sql)
    #[arg(long, env = "HELM_DRIVER", global = true)]
    pub helm_driver: Option<String>,

    /// Helm binary used for chart operations
    #[arg(long, env = "COSMO_HELM_BINARY", default_value = DEFAULT_HELM_BINARY, global = true)]
    pub helm_binary: PathBuf,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn context_overrides(&self) -> ContextOverrides {
        ContextOverrides {
            kubeconfig: self.kubeconfig.clone(),
            cluster: self.cluster.clone(),
            context: self.context.clone(),
            auth_info: self.user.clone(),
            namespace: self.namespace.clone(),
        }
    }

    pub fn helm_settings(&self) -> HelmSettings {
        HelmSettings {
            binary: self.helm_binary.clone(),
            driver: self.helm_driver.clone(),
            namespace: COSMONIC_NAMESPACE.to_string(),
            kube_context: self.context.clone(),
            kubeconfig: self.kubeconfig.clone(),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Launch the Cosmonic console
    Console(ConsoleCommand),

    /// Manage the Nexus Cosmonic control-plane
    Nexus(ChartCommand),

    /// Manage hostgroups within the cluster
    Hostgroup(ChartCommand),

    /// Show the versions of all resources installed for Cosmonic Control
    Version(VersionCommand),

    /// Open the Cosmonic documentation in the default browser
    Docs(DocsCommand),

    /// Open the trial license sign-up page in the default browser
    License(LicenseCommand),
}

impl Commands {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            Commands::Console(cmd) => cmd.execute(global).await,
            Commands::Nexus(cmd) => cmd.execute(&NEXUS, global).await,
            Commands::Hostgroup(cmd) => cmd.execute(&HOSTGROUP, global).await,
            Commands::Version(cmd) => cmd.execute(global).await,
            Commands::Docs(cmd) => cmd.execute(),
            Commands::License(cmd) => cmd.execute(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::charts::ChartAction;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_uninstall_force_flag() {
        let args = CliArgs::try_parse_from(["kubectl-cosmo", "nexus", "uninstall", "--force"]).unwrap();
        match args.command {
            Commands::Nexus(ChartCommand {
                action: Some(ChartAction::Uninstall(uninstall)),
            }) => assert!(uninstall.force),
            other => panic!("unexpected command: {other:?}"),
        }

        let args = CliArgs::try_parse_from(["kubectl-cosmo", "hostgroup", "uninstall"]).unwrap();
        match args.command {
            Commands::Hostgroup(ChartCommand {
                action: Some(ChartAction::Uninstall(uninstall)),
            }) => assert!(!uninstall.force),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "kubectl-cosmo",
            "console",
            "--context",
            "prod",
            "-n",
            "team-a",
            "--user",
            "alice",
        ])
        .unwrap();

        let overrides = args.global.context_overrides();
        assert_eq!(overrides.context.as_deref(), Some("prod"));
        assert_eq!(overrides.namespace.as_deref(), Some("team-a"));
        assert_eq!(overrides.auth_info.as_deref(), Some("alice"));

        let helm = args.global.helm_settings();
        assert_eq!(helm.namespace, "cosmonic-system");
        assert_eq!(helm.kube_context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_bare_chart_command_reports() {
        let args = CliArgs::try_parse_from(["kubectl-cosmo", "hostgroup"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Hostgroup(ChartCommand { action: None })
        ));
    }
}
