//! mailrules - Entry point for the fetch and process commands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use mailrules::config::Settings;
use mailrules::domain::RuleSet;
use mailrules::providers::email::GmailProvider;
use mailrules::services::{IngestService, ProcessService, RuleEngine};
use mailrules::storage::{Database, TokenStore};

#[derive(Debug, Parser)]
#[command(
    name = "mailrules",
    about = "Fetch Gmail messages into a local store and apply JSON-defined rules to them.",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Settings file (defaults to settings.json in the user config directory)
    #[arg(long, global = true, env = "MAILRULES_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Rule file
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// OAuth token file
    #[arg(long, global = true)]
    token: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch recent messages and store the ones not seen before
    Fetch,
    /// Evaluate rules against every stored message and apply their actions
    Process,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let settings = Settings::load_or_default(self.config.as_deref())?;
        Ok(self.settings_with(settings))
    }

    /// Applies command-line overrides on top of loaded settings.
    fn settings_with(&self, mut settings: Settings) -> Settings {
        if let Some(path) = &self.database {
            settings.storage.database_path = path.clone();
        }
        if let Some(path) = &self.rules {
            settings.rules.path = path.clone();
        }
        if let Some(path) = &self.token {
            settings.gmail.token_path = path.clone();
        }
        settings
    }
}

async fn connect(settings: &Settings) -> anyhow::Result<GmailProvider> {
    let mut provider = GmailProvider::new(TokenStore::new(&settings.gmail.token_path))
        .with_api_base(settings.gmail.api_base.clone())
        .with_token_url(settings.gmail.token_url.clone());

    provider
        .authenticate()
        .await
        .context("Gmail authentication failed")?;
    Ok(provider)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings()?;

    match cli.command {
        Command::Fetch => {
            let db = Database::open(&settings.storage.database_path).await?;
            let provider = connect(&settings).await?;

            let report = IngestService::new(db, Arc::new(provider))
                .with_mailbox(settings.gmail.mailbox.clone())
                .with_page_size(settings.gmail.page_size)
                .run()
                .await?;

            if !report.is_success() {
                tracing::warn!(failed = report.errors.len(), "Some messages were not stored");
            }
        }
        Command::Process => {
            let rules = RuleSet::load(&settings.rules.path)?;
            let db = Database::open(&settings.storage.database_path).await?;
            let provider = connect(&settings).await?;

            let report = ProcessService::new(db, Arc::new(provider), RuleEngine::new(rules))
                .run()
                .await?;

            if !report.is_success() {
                tracing::warn!(failed = report.errors.len(), "Some rules were not applied");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "Starting mailrules");

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
