//! apkscout - best-effort APK download-link resolver CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apkscout_cli::cmd;
use apkscout_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Resolve {
            package,
            profile,
            json,
        } => cmd::resolve::resolve(&cli, package, profile, *json).await,
        Commands::Versions {
            package,
            profile,
            json,
        } => cmd::versions::versions(&cli, package, profile, *json).await,
        Commands::Verify { url, json } => cmd::verify::verify(url, *json).await,
        Commands::Fetch {
            package,
            out,
            profile,
        } => cmd::fetch::fetch(&cli, package, out, profile).await,
    }
}
