//! docchat CLI: the main entry point.
//!
//! Commands:
//! - `init`    Write a default config file
//! - `ask`     Answer one question, optionally with prior history
//! - `chat`    Interactive conversation over the indexed documents
//! - `config`  Print the effective configuration
//! - `doctor`  Diagnose config, index and provider health

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod commands;

#[derive(Parser)]
#[command(
    name = "docchat",
    about = "docchat: ask questions about your indexed PDF documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.docchat/config.toml)
    #[arg(short, long, global = true, env = "DOCCHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Answer a single question
    Ask {
        /// The question to ask
        #[arg(short, long)]
        question: String,

        /// JSON file holding prior turns as [["question", "answer"], ...]
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the whole answer at once instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// List the source chunks after the answer
        #[arg(long)]
        sources: bool,

        /// Print the answer and its sources as JSON
        #[arg(long, conflicts_with = "sources")]
        json: bool,
    },

    /// Chat interactively
    Chat {
        /// Print each answer at once instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },

    /// Print the effective configuration (API keys redacted)
    Config,

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only answers.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(app::default_config_path);

    match cli.command {
        Commands::Init { force } => commands::init::run(&config_path, force)?,
        Commands::Ask {
            question,
            history,
            no_stream,
            sources,
            json,
        } => {
            let output = if json {
                commands::ask::Output::Json
            } else if sources {
                commands::ask::Output::WithSources
            } else {
                commands::ask::Output::Plain
            };
            commands::ask::run(&config_path, &question, history.as_deref(), !no_stream, output)
                .await?
        }
        Commands::Chat { no_stream } => commands::chat::run(&config_path, !no_stream).await?,
        Commands::Config => commands::config_cmd::run(&config_path)?,
        Commands::Doctor => commands::doctor::run(&config_path).await?,
    }

    Ok(())
}
