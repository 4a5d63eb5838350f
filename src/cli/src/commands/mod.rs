//! CLI command definitions and dispatch.

mod build_base_images;
mod build_deployment;
mod list_base_images;
mod list_deployments;
mod serve;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use container_factory_core::{FactoryConfig, Result};

/// Container Factory - dependency-ordered container image builds.
#[derive(Parser)]
#[command(name = "container-factory", version, about)]
pub struct Cli {
    /// Image registry base path, e.g. registry.example.com/team
    #[arg(short = 'p', long, global = true)]
    pub registry_base_path: Option<String>,

    /// Base directory holding dockerfiles/ and deployments/
    #[arg(short = 'd', long, global = true)]
    pub base_directory: Option<PathBuf>,

    /// YAML or JSON configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output verbosity (repeat for more: -v warn, -vv info, -vvvv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Build and push every buildable base image
    BuildBaseImages(build_base_images::BuildBaseImagesArgs),
    /// Build and push a single deployment image
    BuildDeployment(build_deployment::BuildDeploymentArgs),
    /// Show the base image hierarchy
    ListBaseImages(list_base_images::ListBaseImagesArgs),
    /// List deployment definitions
    ListDeployments(list_deployments::ListDeploymentsArgs),
    /// Run the HTTP front-end
    Serve(serve::ServeArgs),
}

impl Cli {
    /// Merge the optional config file with global flags. Flags win.
    pub fn load_config(&self) -> Result<FactoryConfig> {
        let mut config = match &self.config {
            Some(path) => FactoryConfig::from_file(path)?,
            None => FactoryConfig::default(),
        };
        if let Some(dir) = &self.base_directory {
            config.base_directory = dir.clone();
        }
        if let Some(registry) = &self.registry_base_path {
            config.registry_base_path = Some(registry.clone());
        }
        Ok(config)
    }
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Command::BuildBaseImages(args) => build_base_images::execute(args, config).await,
        Command::BuildDeployment(args) => build_deployment::execute(args, config).await,
        Command::ListBaseImages(args) => list_base_images::execute(args, config).await,
        Command::ListDeployments(args) => list_deployments::execute(args, config).await,
        Command::Serve(args) => serve::execute(args, config).await,
    }
}
