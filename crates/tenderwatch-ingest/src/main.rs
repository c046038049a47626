//! Tenderwatch Ingest - procurement feed watcher

use anyhow::Result;
use clap::Parser;
use tenderwatch_common::logging::{init_logging, LogConfig, LogLevel};
use tenderwatch_ingest::cli::{CacheCommand, Cli, Commands, ConfigCommand, FilterCommand};
use tenderwatch_ingest::commands;
use tenderwatch_ingest::config::IngestConfig;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("tenderwatch-ingest")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;
    let _guard = init_logging(&log_config)?;

    let config = IngestConfig::from_file_and_env(&cli.config)?;
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Sync { feeds } => commands::sync::run(&config, feeds).await?,
        Commands::Filter { command } => match command {
            FilterCommand::Verify => commands::filter::verify(&config).await?,
            FilterCommand::Clear => commands::filter::clear(&config).await?,
        },
        Commands::Cache { command } => match command {
            CacheCommand::Show => commands::cache::show(&config).await?,
            CacheCommand::Clear => commands::cache::clear(&config).await?,
        },
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::config::show(&config).await?,
            ConfigCommand::Save => commands::config::save(&config, &cli.config).await?,
        },
    }

    Ok(())
}
