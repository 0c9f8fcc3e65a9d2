//! Main entry point for the docs-translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docs_translator::cli::commands::{self, Commands};
use docs_translator::SyncConfig;

/// Docs Translator - sync documentation with a translation service
#[derive(Parser, Debug)]
#[command(name = "docs-translator", version, about, long_about = None)]
struct Args {
    /// Config file (defaults to docs-translator.{toml,yaml,json} if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API token (optional, defaults to DOCS_TRANSLATOR_API_TOKEN env var)
    #[arg(long)]
    api_token: Option<String>,

    /// Translation service base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("docs_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config =
        SyncConfig::load(args.config.as_deref())?.with_overrides(args.api_token, args.api_url);

    match args.command {
        Commands::Plan { json } => commands::handle_plan(config, json).await?,
        Commands::Translate { yes } => commands::handle_translate(config, yes).await?,
        Commands::Pull => commands::handle_pull(config).await?,
        Commands::Scaffold => commands::handle_scaffold(config).await?,
    }

    Ok(())
}
