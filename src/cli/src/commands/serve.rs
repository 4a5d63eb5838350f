//! `container-factory serve` command.

use clap::Args;
use container_factory_core::{FactoryConfig, Result};

use crate::server;

#[derive(Args)]
pub struct ServeArgs {
    /// Port for the web server to listen on (default 8080)
    #[arg(long)]
    pub listen_port: Option<u16>,
}

pub async fn execute(args: ServeArgs, mut config: FactoryConfig) -> Result<()> {
    if let Some(port) = args.listen_port {
        config.listen_port = port;
    }
    server::serve(config).await
}
