//! `container-factory build-base-images` command.

use clap::Args;
use container_factory_core::{FactoryConfig, Result};
use container_factory_runtime::Factory;

use crate::output;

#[derive(Args)]
pub struct BuildBaseImagesArgs {
    /// Bypass the build cache for every image
    #[arg(short, long)]
    pub force_rebuild: bool,

    /// Skip pushing built images to the registry
    #[arg(short, long)]
    pub local_only: bool,

    /// Tag for built images (defaults to the current user name)
    #[arg(short = 't', long)]
    pub image_tag: Option<String>,

    /// Maximum number of simultaneous builds (unbounded by default)
    #[arg(short = 'j', long)]
    pub max_parallel: Option<usize>,
}

impl BuildBaseImagesArgs {
    fn apply(self, mut config: FactoryConfig) -> FactoryConfig {
        config.force_rebuild |= self.force_rebuild;
        if self.local_only {
            config.push = false;
        }
        if self.image_tag.is_some() {
            config.tag = self.image_tag;
        }
        if self.max_parallel.is_some() {
            config.max_parallel_builds = self.max_parallel;
        }
        config
    }
}

pub async fn execute(args: BuildBaseImagesArgs, config: FactoryConfig) -> Result<()> {
    let factory = Factory::new(args.apply(config))?;
    let report = factory.build_base_images().await?;

    println!("{}", output::build_report_table(&report, factory.config().push));
    Ok(())
}
