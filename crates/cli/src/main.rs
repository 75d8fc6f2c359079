//! Rights Agent CLI
//!
//! Main entry point for the `rights` command-line tool.
//! Answers human rights questions with retrieval-augmented generation.

mod commands;
mod runtime;

use clap::{Parser, Subcommand};
use commands::{AskCommand, HistoryCommand, PromptsCommand, RetrieveCommand, StatsCommand};
use rights_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Rights Agent CLI - human rights reports from retrieved documents
#[derive(Parser, Debug)]
#[command(name = "rights")]
#[command(about = "Human rights question answering with local RAG", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RIGHTS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RIGHTS_CONFIG")]
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

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Generation provider (ollama)
    #[arg(short, long, global = true, env = "RIGHTS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "RIGHTS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the agent a question
    Ask(AskCommand),

    /// Show the documents retrieved for a query
    Retrieve(RetrieveCommand),

    /// Show embedding index statistics
    Stats(StatsCommand),

    /// List built-in and workspace prompts
    Prompts(PromptsCommand),

    /// Show or clear a chat session
    History(HistoryCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    )?;

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Rights Agent CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.llm.provider, config.llm.model);

    config.validate()?;
    config.ensure_rights_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Retrieve(_) => "retrieve",
        Commands::Stats(_) => "stats",
        Commands::Prompts(_) => "prompts",
        Commands::History(_) => "history",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Retrieve(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config),
        Commands::Prompts(cmd) => cmd.execute(&config),
        Commands::History(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
