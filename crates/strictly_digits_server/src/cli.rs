//! Command-line interface for strictly_digits.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Strictly Digits - five-digit code-breaking game server
#[derive(Parser, Debug)]
#[command(name = "strictly_digits")]
#[command(about = "Five-digit code-breaking game with persistent statistics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file (default: strictly_digits.toml, if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(long)]
    pub db_path: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Play in the terminal
    Play {
        /// Display name of the player (created if missing)
        #[arg(short, long)]
        user: String,
    },

    /// Print statistics
    Stats {
        /// Show one player's statistics and history instead of the totals
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Manage player profiles
    User {
        /// Profile action
        #[command(subcommand)]
        action: UserAction,
    },
}

/// Profile actions
#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Register a new player
    Add {
        /// Display name
        name: String,
    },

    /// List registered players
    List,
}
