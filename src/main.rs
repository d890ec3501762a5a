//! ticket-triage - support-ticket tracker with asynchronous AI triage
//!
//! This is the main entry point for the ticket-triage CLI application.
//! It parses arguments, loads configuration and dispatches to the command
//! handlers.

use clap::Parser;
use std::process;
use ticket_triage::cli::handlers::{
    handle_config_show, handle_serve, handle_sweep, handle_user_list, handle_user_set_role,
};
use ticket_triage::cli::{Cli, Commands, ConfigCommands, OutputFormatter, UserCommands};
use ticket_triage::config::Config;
use ticket_triage::error::{Result, TriageError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.json, cli.no_color);
    init_tracing(cli.verbose);

    if let Err(e) = run(cli, &formatter).await {
        handle_error(&e, &formatter);
        process::exit(1);
    }
}

/// `--verbose` forces debug; otherwise `RUST_LOG`, falling back to info
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => handle_serve(config, host, port, formatter).await,
        Commands::Sweep {
            older_than,
            include_failed,
        } => handle_sweep(config, older_than, include_failed, formatter).await,
        Commands::User(UserCommands::SetRole { email, role }) => {
            handle_user_set_role(config, &email, role, formatter).await
        },
        Commands::User(UserCommands::List) => handle_user_list(config, formatter).await,
        Commands::Config(ConfigCommands::Show) => handle_config_show(&config, formatter),
    }
}

fn handle_error(error: &TriageError, formatter: &OutputFormatter) {
    // Operators get the full message; the API is what hides internals
    formatter.error(&error.to_string());

    let suggestions = error.suggestions();
    if !suggestions.is_empty() {
        eprintln!("\nSuggestions:");
        for suggestion in &suggestions {
            eprintln!("  • {suggestion}");
        }
    }

    if formatter.is_json() {
        let _ = formatter.print_json(&serde_json::json!({
            "status": "error",
            "error": error.to_string(),
            "suggestions": suggestions,
            "recoverable": error.is_recoverable(),
            "is_config_error": error.is_config_error(),
        }));
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}
