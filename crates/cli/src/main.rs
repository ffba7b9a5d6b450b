//! Compass CLI
//!
//! Main entry point for the compass command-line tool: document-grounded
//! question answering with per-user conversation memory.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, ChatCommand, ClearCommand, HistoryCommand, LearnCommand, ReindexCommand,
    ResetCommand, StatsCommand,
};
use compass_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Compass - answers grounded in your documents, with conversation memory
#[derive(Parser, Debug)]
#[command(name = "compass")]
#[command(about = "Answers grounded in your documents, with conversation memory", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "COMPASS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "COMPASS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion provider (gemini, ollama)
    #[arg(short, long, global = true, env = "COMPASS_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "COMPASS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add documents to the corpus
    Learn(LearnCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// Interactive conversation
    Chat(ChatCommand),

    /// Show conversation history
    History(HistoryCommand),

    /// Clear conversation history
    Clear(ClearCommand),

    /// Show corpus statistics
    Stats(StatsCommand),

    /// Re-embed every stored fragment
    Reindex(ReindexCommand),

    /// Delete the corpus
    Reset(ResetCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Learn(_) => "learn",
            Commands::Ask(_) => "ask",
            Commands::Chat(_) => "chat",
            Commands::History(_) => "history",
            Commands::Clear(_) => "clear",
            Commands::Stats(_) => "stats",
            Commands::Reindex(_) => "reindex",
            Commands::Reset(_) => "reset",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // API keys may live in a local .env file
    dotenvy::dotenv().ok();

    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration; the CLI workspace decides which config file is read
    let config = AppConfig::load(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Compass CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Completion: {} ({})", config.llm.provider, config.llm.model);
    tracing::debug!(
        "Embedding: {} ({})",
        config.embedding.provider,
        config.embedding.model
    );

    config.validate()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Learn(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::History(cmd) => cmd.execute(&config).await,
        Commands::Clear(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Reindex(cmd) => cmd.execute(&config).await,
        Commands::Reset(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
