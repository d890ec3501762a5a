//! Command-line interface
//!
//! `serve` runs the HTTP API together with the triage worker and the sweep.
//! The remaining commands are operator utilities working directly on the
//! data directory.

pub mod handlers;
mod output;

pub use output::OutputFormatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::Role;

#[derive(Parser, Debug)]
#[command(
    name = "ticket-triage",
    version,
    about = "Support-ticket tracker with AI triage and skill-based routing"
)]
pub struct Cli {
    /// Configuration file (defaults to ./ticket-triage.{yaml,toml,json})
    #[arg(short, long, global = true, env = "TRIAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API, triage worker and periodic sweep
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,

        /// Override server.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Triage stale OPEN tickets once, inline
    Sweep {
        /// Minimum ticket age in seconds (defaults to sweep.stale_after_secs)
        #[arg(long, value_name = "SECS")]
        older_than: Option<u64>,

        /// Also retry tickets whose triage already gave up
        #[arg(long)]
        include_failed: bool,
    },

    /// Manage user accounts
    #[command(subcommand)]
    User(UserCommands),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Change a user's role, e.g. to bootstrap the first admin
    SetRole {
        #[arg(long)]
        email: String,

        /// user, moderator or admin
        #[arg(long)]
        role: Role,
    },

    /// List registered users
    List,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration with secrets redacted
    Show,
}
