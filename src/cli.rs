//! Command-line interface for strictly_sessions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Sessions - multiplayer session server for turn-based games
#[derive(Parser, Debug)]
#[command(name = "strictly_sessions")]
#[command(about = "Actor-based multiplayer session server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP and WebSocket server
    Serve {
        /// Path to the TOML config file (defaults are used if it does not exist)
        #[arg(short, long, default_value = "server.toml")]
        config: PathBuf,

        /// Override the configured host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the configured static directory
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Run in production mode (no permissive CORS)
        #[arg(long)]
        production: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Path to the TOML config file
        #[arg(short, long, default_value = "server.toml")]
        config: PathBuf,
    },
}
