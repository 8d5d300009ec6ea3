pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::holdings::Book;
use crate::core::quote_cache::QuoteCache;
use crate::providers::YahooQuoteFetcher;
use anyhow::Result;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Commands that need a loaded configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Summary,
    Check,
    Convert { amount: f64, from: String, to: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ppfin starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let fetcher = YahooQuoteFetcher::new(config.yahoo_base_url())?;
    let cache = QuoteCache::new(
        Arc::new(fetcher),
        config.quotes.to_policy(),
        Handle::current(),
    );
    let book = Book::from_config(&config)?;

    match command {
        AppCommand::Summary => cli::summary::run(&book, &cache, &config.currency).await,
        AppCommand::Check => cli::check::run(&book, &cache, &config.currency).await,
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(&cache, amount, &from, &to).await
        }
    }
}
