//! Portal Client CLI
//!
//! Thin command-line front end over the typed resource API.

mod cli;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portal_client::config::{Args, ClientConfig};
use portal_client::{ApiClient, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = ClientConfig::from_args(&args).context("Failed to load configuration")?;

    // Initialize logging
    let filter = EnvFilter::new(config.log_level.as_filter());
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("Portal client v{}", VERSION);

    let client = ApiClient::connect(&config)
        .await
        .context("Failed to connect to portal")?;

    cli::run(&client, args.command).await
}
