#![forbid(unsafe_code)]

//! idpctl
//!
//! Command-line interface for the identity provider layer.

mod cli;
mod handlers;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; `log` records from the library crates are bridged.
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = %args.config.display(), "starting idpctl");

    match args.command {
        Command::Config { action } => handlers::handle_config_command(&args.config, action),
        Command::Token { action } => handlers::handle_token_command(&args.config, action).await,
        Command::Serve { addr } => handlers::cmd_serve(&args.config, addr).await,
    }
}
