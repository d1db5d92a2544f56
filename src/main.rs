mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::info;

use convertbox::artifacts::ArtifactStore;
use convertbox::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => convertbox::api::server::run(args.address).await?,
        Commands::Sweep => {
            let config = Config::load()?;
            let store = ArtifactStore::open(&config.server.ledger_path)?;
            let stats = store.sweep_expired()?;
            info!(
                records = stats.records_removed,
                files = stats.files_removed,
                "Sweep finished"
            );
        }
    }

    Ok(())
}
