//! straybot - Straylight Bot demo REPL.
//!
//! Reads lines from stdin, dispatches them through the command processor,
//! and prints replies to stdout.

use std::sync::Arc;
use straybot::config::{Config, ConfigError};
use straybot::demo;
use straybot::dispatch::CommandProcessor;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration; a missing file falls back to defaults.
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "straybot.toml".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(ConfigError::Io(_)) => {
            info!(path = %config_path, "no config file found, using defaults");
            Config::default()
        }
        Err(e) => {
            error!(path = %config_path, error = %e, "failed to load config");
            return Err(e.into());
        }
    };
    let prefixes = config.prefixes()?;

    info!(
        bot = %config.bot.name,
        modules = ?config.modules.autoload,
        "starting straybot"
    );

    let resolver = demo::resolver(config.args.bounds_policy.into());
    let processor = CommandProcessor::new(Arc::new(resolver));
    for err in processor.load_modules(&config.modules.autoload).await {
        error!(error = %err, "module failed to load");
    }

    // Replies go through a channel so handlers never block on stdout.
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(64);
    tokio::spawn(async move {
        while let Some(line) = reply_rx.recv().await {
            println!("{line}");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        processor
            .process_line(&prefixes, &line, Some(reply_tx.clone()))
            .await;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
