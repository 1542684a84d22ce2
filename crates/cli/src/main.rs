//! parley CLI: the main entry point.
//!
//! Commands:
//! - `serve`: start the HTTP gateway and worker pool
//! - `chat`: answer one query in-process, streaming to stdout
//! - `onboard`: write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "parley: queue-backed streaming chat with a ReAct agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.parley/config.toml
    #[arg(short, long, global = true, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the number of workers
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Ask a single question
    Chat {
        /// The query to send
        #[arg(short, long)]
        message: String,

        /// `normal` for a direct answer, `agent` for tool use
        #[arg(long, default_value = "normal")]
        mode: String,

        /// Model identifier, optionally `provider:model`
        #[arg(long)]
        model: Option<String>,

        /// Session whose history to use and extend
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Username recorded with the history
        #[arg(short, long, default_value = "cli")]
        user: String,
    },

    /// Write the default configuration file
    Onboard {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Logs go to stderr so `chat` output on stdout stays clean.
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { host, port, workers } => {
            commands::serve::run(config_path, host, port, workers).await?
        }
        Commands::Chat {
            message,
            mode,
            model,
            session,
            user,
        } => {
            let request = commands::chat::ChatArgs {
                query: message,
                mode,
                model,
                session,
                user,
            };
            commands::chat::run(config_path, request).await?
        }
        Commands::Onboard { force } => commands::onboard::run(config_path, force).await?,
    }

    Ok(())
}
