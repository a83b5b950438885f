// Keydeck - local manager for AI inference API credentials
// Main entry point

// Allow dead code for unused helper functions and types that are part of the API
#![allow(dead_code)]

mod backup;
mod commands;
mod config;
mod core;
mod db;
mod secrets;
mod state;
mod types;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

/// Keydeck - AI API credential manager
/// Stores endpoint credentials encrypted at rest, tests them, and keeps dated backups
#[derive(Parser, Debug)]
#[command(name = "keydeck")]
#[command(version)]
#[command(about = "Manage, test and back up AI API credentials", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a new credential
    Add {
        /// Display name
        #[arg(value_name = "NAME")]
        name: String,

        /// Base endpoint URL (e.g. https://api.openai.com/v1)
        #[arg(short, long, value_name = "URL")]
        url: String,

        /// Secret API key
        #[arg(short, long, value_name = "KEY")]
        key: String,

        /// Provider type (openai-compatible, anthropic-compatible, custom, ...)
        #[arg(short, long, value_name = "PROVIDER")]
        provider: Option<String>,

        /// Free-form description
        #[arg(short, long, value_name = "TEXT")]
        description: Option<String>,

        /// Create the credential as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// List credentials page by page
    #[command(visible_alias = "ls")]
    List {
        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Items per page
        #[arg(long, default_value_t = types::DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Filter by name, URL, description or provider
        #[arg(short, long, value_name = "QUERY")]
        search: Option<String>,

        /// Output as JSON
        #[arg(long, conflicts_with = "verbose")]
        json: bool,

        /// Show every field
        #[arg(short, long)]
        verbose: bool,
    },

    /// Search credentials
    Search {
        /// Search query
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Update a credential
    Update {
        /// Credential id or name
        #[arg(value_name = "ID")]
        id: String,

        #[arg(long, value_name = "NAME")]
        name: Option<String>,

        #[arg(short, long, value_name = "URL")]
        url: Option<String>,

        #[arg(short, long, value_name = "KEY")]
        key: Option<String>,

        #[arg(short, long, value_name = "PROVIDER")]
        provider: Option<String>,

        /// New description (empty string clears it)
        #[arg(short, long, value_name = "TEXT")]
        description: Option<String>,

        /// active or inactive
        #[arg(long, value_name = "STATUS")]
        status: Option<String>,
    },

    /// Delete one or more credentials
    #[command(visible_aliases = ["del", "rm"])]
    Delete {
        /// Credential ids or names
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// Send a chat completion request with a stored credential
    Test {
        /// Credential id or name
        #[arg(value_name = "ID")]
        id: String,

        /// Message to send
        #[arg(short, long, default_value = "Hello")]
        message: String,

        #[arg(long, default_value = types::DEFAULT_TEST_MODEL)]
        model: String,

        #[arg(long, default_value_t = types::DEFAULT_TEST_TEMPERATURE)]
        temperature: f64,

        #[arg(long, default_value_t = types::DEFAULT_MAX_TOKENS)]
        max_tokens: u32,

        /// Print the raw provider response
        #[arg(long)]
        raw: bool,
    },

    /// Show statistics
    Stats {
        /// Show storage details and recent activity
        #[arg(short, long)]
        verbose: bool,
    },

    /// Manage backup snapshots
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Export all data to a JSON bundle
    Export {
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<String>,
    },

    /// Import a JSON bundle produced by export
    Import {
        /// Bundle file path
        #[arg(value_name = "FILE")]
        file: String,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// Show or change settings
    Config {
        /// Setting name
        #[arg(value_name = "KEY")]
        key: Option<String>,

        /// New value
        #[arg(value_name = "VALUE")]
        value: Option<String>,
    },

    /// Run periodic sync until interrupted
    Watch {
        /// Override the configured interval (seconds)
        #[arg(short, long, value_name = "SECONDS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum BackupAction {
    /// Take a snapshot now
    Create,

    /// List stored snapshots
    List,

    /// Restore a snapshot by key or date (YYYY-MM-DD)
    Restore {
        #[arg(value_name = "BACKUP")]
        backup: String,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// Apply the retention cap now
    Clean,
}

fn init_logging() {
    let default_filter = if std::env::var("DEBUG").is_ok() {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    // Initialize system
    let mut ctx = match core::initialize(config::AppConfig::from_env()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            std::process::exit(1);
        }
    };

    if let Some(warning) = &ctx.load_warning {
        eprintln!("{} {}", "Warning:".yellow(), warning);
    }

    // Execute command
    let result = match cli.command {
        Commands::Add { .. } => commands::add::execute(&ctx, cli.command).await,
        Commands::List { .. } => commands::list::execute(&ctx, cli.command).await,
        Commands::Search { .. } => commands::search::execute(&ctx, cli.command).await,
        Commands::Update { .. } => commands::update::execute(&ctx, cli.command).await,
        Commands::Delete { .. } => commands::delete::execute(&ctx, cli.command).await,
        Commands::Test { .. } => commands::test_cmd::execute(&ctx, cli.command).await,
        Commands::Stats { .. } => commands::stats::execute(&ctx, cli.command).await,
        Commands::Backup { .. } => commands::backup::execute(&ctx, cli.command).await,
        Commands::Export { .. } => commands::export::execute(&ctx, cli.command).await,
        Commands::Import { .. } => commands::import::execute(&ctx, cli.command).await,
        Commands::Config { .. } => commands::config::execute(&mut ctx, cli.command).await,
        Commands::Watch { .. } => commands::watch::execute(&ctx, cli.command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red(), state::error_message(&e));
        std::process::exit(1);
    }

    Ok(())
}
