mod actor_framework;
mod app_system;
mod cli;
mod clients;
mod config;
mod domain;
mod menu_actor;
mod order_actor;
mod store;
mod tracker;
mod user_actor;

#[cfg(test)]
mod mock_framework;

use clap::Parser;
use tracing::info;
use crate::app_system::setup_tracing;
use crate::cli::Cli;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    // Setup tracing once for the entire application
    setup_tracing(&config.logging.level);
    info!(database = %config.database.target(), "Starting Cloud Kitchen");

    cli::run(cli, config).await
}
