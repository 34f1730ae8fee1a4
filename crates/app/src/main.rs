//! Shelfscan - Main Entry Point
//!
//! Installs logging, loads configuration, wires the reqwest transport
//! into the API client and runs the requested command.

mod cli;
mod commands;
mod render;

use std::sync::Arc;

use clap::Parser;
use shelfscan_application::ShelfApi;
use shelfscan_infrastructure::{ClientConfig, ReqwestTransport};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref())?;
    tracing::debug!(base_url = %config.base_url, "configuration loaded");

    let transport = ReqwestTransport::new(&config)?;
    let api = ShelfApi::new(Arc::new(transport));

    commands::run(cli.command, api, &config).await?;

    Ok(())
}
