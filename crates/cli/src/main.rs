//! LLMpu CLI — the main entry point.
//!
//! Commands:
//! - `chat`         — Interactive chat driven through the processing unit
//! - `init`         — Write a default config file
//! - `memory show`  — Print the contents of a saved memory file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "llmpu",
    about = "LLMpu: drive an LLM like a tiny processor",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.llmpu/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model through the processing unit
    Chat(commands::chat::ChatArgs),

    /// Write a default configuration file
    Init,

    /// Inspect saved memory files
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Print every memory location and its turns
    Show {
        /// Memory file to read
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat(args) => commands::chat::run(cli.config, args).await?,
        Commands::Init => commands::init::run(cli.config).await?,
        Commands::Memory { action } => match action {
            MemoryAction::Show { file } => commands::memory::show(&file).await?,
        },
    }

    Ok(())
}
