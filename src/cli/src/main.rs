//! Container Factory CLI entry point.

use clap::Parser;
use container_factory_core::LogLevel;
use tracing_subscriber::EnvFilter;

use container_factory_cli::commands::{dispatch, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(LogLevel::from_verbosity(cli.verbose).as_directive())
        }))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
