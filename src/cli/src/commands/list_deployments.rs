//! `container-factory list-deployments` command.

use clap::Args;
use container_factory_core::{FactoryConfig, Result};
use container_factory_runtime::{Factory, OutputFormat};

use super::list_base_images::with_newline;

#[derive(Args)]
pub struct ListDeploymentsArgs {
    /// Output format: text, json or yaml
    #[arg(short, long, default_value = "text")]
    pub output_format: OutputFormat,
}

pub async fn execute(args: ListDeploymentsArgs, config: FactoryConfig) -> Result<()> {
    let inventory = Factory::new(config)?.deployment_inventory()?;
    print!("{}", with_newline(inventory.render(args.output_format)?));
    Ok(())
}
