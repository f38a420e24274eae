//! Chart lifecycle commands

use super::commands::GlobalArgs;
use super::display::{render_release_line, TableRenderer};
use crate::domain::chart::{ChartManager, Component, ALL};
use crate::infrastructure::helm::HelmCli;
use crate::infrastructure::registry::OciRegistryClient;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug, Clone)]
pub struct ChartCommand {
    /// Without an action, print the installed and available versions
    #[command(subcommand)]
    pub action: Option<ChartAction>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ChartAction {
    /// Install the chart at the newest published version
    Install,

    /// Upgrade the chart to the newest published version
    Update,

    /// Uninstall the release
    Uninstall(UninstallArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct UninstallArgs {
    /// Confirm removal of the release and everything it deployed
    #[arg(long)]
    pub force: bool,
}

fn chart_manager(global: &GlobalArgs) -> anyhow::Result<ChartManager> {
    let runtime = Arc::new(HelmCli::new(global.helm_settings()));
    let registry = Arc::new(OciRegistryClient::new()?);
    Ok(ChartManager::new(runtime, registry))
}

impl ChartCommand {
    pub async fn execute(&self, component: &Component, global: &GlobalArgs) -> anyhow::Result<()> {
        let manager = chart_manager(global)?;

        match &self.action {
            None => {
                let release = manager.report(component).await?;
                println!("{}", render_release_line(&release));
            }
            Some(ChartAction::Install) => {
                let version = manager.install(component).await?;
                println!("{} {} installed successfully!", component.display_name, version);
            }
            Some(ChartAction::Update) => {
                let version = manager.update(component).await?;
                println!("{} updated to {} successfully!", component.display_name, version);
            }
            Some(ChartAction::Uninstall(args)) => {
                manager.uninstall(component, args.force).await?;
                println!("{} uninstalled successfully!", component.display_name);
            }
        }

        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct VersionCommand {}

impl VersionCommand {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let manager = chart_manager(global)?;

        let mut releases = Vec::with_capacity(ALL.len());
        for component in &ALL {
            releases.push(manager.report(component).await?);
        }

        let renderer = TableRenderer::new();
        println!("{}", renderer.render_versions(&releases));
        Ok(())
    }
}
