//! Strictly Sessions - server binary.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use strictly_sessions::ServerConfig;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_sessions=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            static_dir,
            production,
        } => run_server(config, host, port, static_dir, production).await,
        Command::Config { config } => print_config(config),
    }
}

/// Run the session server
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_server(
    config_path: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
    production: bool,
) -> Result<()> {
    let mut config = ServerConfig::load_or_default(&config_path)?;
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(dir) = static_dir {
        config = config.with_static_dir(dir);
    }
    if production {
        config = config.with_production(true);
    }

    info!(
        addr = %config.bind_address(),
        production = *config.production(),
        "Starting Strictly Sessions server"
    );
    strictly_sessions::run(config).await
}

/// Print the effective configuration
fn print_config(config_path: PathBuf) -> Result<()> {
    let config = ServerConfig::load_or_default(&config_path)?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
