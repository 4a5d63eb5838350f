//! `container-factory build-deployment` command.

use clap::Args;
use container_factory_core::{FactoryConfig, Result};
use container_factory_runtime::Factory;

use crate::output;

#[derive(Args)]
pub struct BuildDeploymentArgs {
    /// Deployment name, relative to the deployments directory
    pub name: String,

    /// Skip pushing the built image to the registry
    #[arg(short, long)]
    pub local_only: bool,

    /// Tag of the base images the deployment is built on
    #[arg(short = 't', long)]
    pub image_tag: Option<String>,

    /// Tag for the deployment image (defaults to the image tag)
    #[arg(long)]
    pub deployment_tag: Option<String>,
}

pub async fn execute(args: BuildDeploymentArgs, mut config: FactoryConfig) -> Result<()> {
    if args.local_only {
        config.push = false;
    }
    if args.image_tag.is_some() {
        config.tag = args.image_tag;
    }
    if args.deployment_tag.is_some() {
        config.deployment_tag = args.deployment_tag;
    }

    let factory = Factory::new(config)?;
    let report = factory.build_deployment(&args.name).await?;

    println!("{}", output::build_report_table(&report, factory.config().push));
    Ok(())
}
