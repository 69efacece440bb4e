use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use feedpost_core::{storage::Database, AppConfig};

mod commands;

#[derive(Parser)]
#[command(name = "feedpost")]
#[command(author, version, about = "Publishes summarized RSS articles to a Telegram channel")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file (default: ~/.config/feedpost/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fetch and publish loops until interrupted
    Run,
    /// Fetch every source once
    Fetch,
    /// Publish at most one article
    Publish,
    /// Manage feed sources
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
}

#[derive(Subcommand)]
enum SourceAction {
    /// Add a feed after checking that it can be fetched
    Add {
        /// Display name, also used as a hashtag
        #[arg(short, long)]
        name: String,
        /// RSS or Atom feed URL
        #[arg(short, long)]
        url: String,
        /// Ordering hint
        #[arg(short, long, default_value_t = 0)]
        priority: i64,
        /// Accept invalid TLS certificates for this feed
        #[arg(long)]
        insecure: bool,
    },
    /// List all sources
    List,
    /// Show one source
    Get { id: i64 },
    /// Change the priority of a source
    SetPriority { id: i64, priority: i64 },
    /// Remove a source
    Delete { id: i64 },
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    init_logging(&config);
    let config = Arc::new(config);

    // Initialize database
    let db = Database::new(&config).await?;

    match cli.command {
        Some(Commands::Run) | None => commands::run::run(config, db).await,
        Some(Commands::Fetch) => commands::fetch::run(&config, &db).await,
        Some(Commands::Publish) => commands::publish::run(&config, &db).await,
        Some(Commands::Source { action }) => match action {
            SourceAction::Add {
                name,
                url,
                priority,
                insecure,
            } => commands::source::add(&db, &config, &name, &url, priority, insecure).await,
            SourceAction::List => commands::source::list(&db).await,
            SourceAction::Get { id } => commands::source::get(&db, id).await,
            SourceAction::SetPriority { id, priority } => {
                commands::source::set_priority(&db, id, priority).await
            }
            SourceAction::Delete { id } => commands::source::delete(&db, id).await,
        },
    }
}
