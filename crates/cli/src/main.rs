//! taskpilot CLI: the main entry point.
//!
//! Usage:
//! - `taskpilot <message...>`: run a single turn, print the reply
//! - `taskpilot`             : interactive session until `exit`, `quit` or EOF
//! - `taskpilot init`        : write a starter config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod repl;

#[derive(Parser)]
#[command(
    name = "taskpilot",
    about = "taskpilot: manage your todo list in plain language",
    version,
    author,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Message to send (omit for interactive mode)
    message: Vec<String>,

    /// Path to the config file (default: ~/.taskpilot/config.toml)
    #[arg(short, long, global = true, env = "TASKPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Keep todos in memory for this session only
    #[arg(long, global = true)]
    memory: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so replies on stdout stay clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::Init { force }) => commands::init::run(cli.config, force)?,
        None => {
            let message = if cli.message.is_empty() {
                None
            } else {
                Some(cli.message.join(" "))
            };
            let options = commands::agent::AgentOptions {
                config_path: cli.config,
                in_memory: cli.memory,
            };
            commands::agent::run(message, options).await?;
        }
    }

    Ok(())
}
