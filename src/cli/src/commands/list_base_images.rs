//! `container-factory list-base-images` command.

use clap::Args;
use container_factory_core::{FactoryConfig, Result};
use container_factory_runtime::{Factory, OutputFormat};

#[derive(Args)]
pub struct ListBaseImagesArgs {
    /// Output format: text, json or yaml
    #[arg(short, long, default_value = "text")]
    pub output_format: OutputFormat,
}

pub async fn execute(args: ListBaseImagesArgs, config: FactoryConfig) -> Result<()> {
    let inventory = Factory::new(config)?.image_inventory()?;
    print!("{}", with_newline(inventory.render(args.output_format)?));
    Ok(())
}

/// JSON rendering carries no trailing newline; text and YAML already do.
pub(super) fn with_newline(mut rendered: String) -> String {
    if !rendered.is_empty() && !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    rendered
}
