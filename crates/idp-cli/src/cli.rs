//! Command-line definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use idp_core::TokenType;

/// Identity provider maintenance tool
#[derive(Parser, Debug)]
#[command(name = "idpctl", author, version, about, long_about = None)]
pub struct Args {
    /// Settings file
    #[arg(short, long, env = idp_core::config::ENV_CONFIG_PATH, default_value = "idp.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Validate or revoke a credential against the configured provider
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Serve `/whoami` behind the authentication middleware
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Load settings and initialize the provider exactly as the server does
    Check,
    /// Print the resolved settings (file plus environment overrides)
    Show,
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
    /// Authenticate a token and print the resulting context
    Validate {
        token: String,
        /// Declared token type (access, refresh, service)
        #[arg(long = "type", value_parser = parse_token_type)]
        token_type: Option<TokenType>,
    },
    /// Revoke a token
    Revoke {
        token: String,
        /// Declared token type; omitted means the provider must infer it
        #[arg(long = "type", value_parser = parse_token_type)]
        token_type: Option<TokenType>,
    },
}

fn parse_token_type(s: &str) -> Result<TokenType, String> {
    s.parse().map_err(|e: idp_core::Error| e.to_string())
}
