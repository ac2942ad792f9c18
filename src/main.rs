//! # DueBot
//!
//! Personal task-reminder bot for Telegram.
//!
//! Usage:
//!   duebot                          # Config from ~/.duebot/config.toml + env
//!   duebot --config ./duebot.toml   # Explicit config file
//!   duebot --no-store --verbose     # Memory-only tasks, debug logging

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use duebot_channels::TelegramChannel;
use duebot_core::DueBotConfig;
use duebot_core::traits::Channel;
use duebot_dispatch::Bot;
use duebot_scheduler::{DailySchedule, ReminderEngine, TaskStore, spawn_digest_loop};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duebot", version, about = "Personal task-reminder Telegram bot")]
struct Cli {
    /// Config file (default: ~/.duebot/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep tasks in memory only
    #[arg(long)]
    no_store: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "duebot=debug" } else { "duebot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => DueBotConfig::load_from(path)?,
        None => DueBotConfig::load()?,
    };
    config.apply_env();
    config.validate()?;

    let engine = if config.store.enabled && !cli.no_store {
        ReminderEngine::with_store(TaskStore::new(&config.store.resolved_path()))
            .retain_done_days(config.store.retain_done_days)
    } else {
        tracing::info!("Task store disabled; tasks are lost on restart");
        ReminderEngine::in_memory()
    }
    .into_shared();

    let telegram = TelegramChannel::new(config.bot_token.clone(), config.telegram.poll_interval);
    telegram
        .connect()
        .await
        .context("could not reach Telegram with the configured bot token")?;
    let channel: Arc<dyn Channel> = Arc::new(telegram.clone());

    let schedule = DailySchedule::from_config(&config.digest)?;
    let provider = duebot_providers::create_provider(&config.ai);
    let bot = Arc::new(Bot::new(engine.clone(), channel.clone(), provider, schedule));

    tokio::spawn(spawn_digest_loop(
        engine,
        channel,
        schedule,
        config.digest.skip_idle,
    ));

    println!("DueBot v{} running. Press Ctrl+C to stop.", env!("CARGO_PKG_VERSION"));
    let mut updates = telegram.start_polling();
    loop {
        tokio::select! {
            event = updates.next() => {
                let Some(event) = event else {
                    tracing::warn!("Telegram update stream ended");
                    break;
                };
                let bot = bot.clone();
                tokio::spawn(async move {
                    let user = event.user_id();
                    if let Err(e) = bot.handle(event).await {
                        tracing::warn!("Reply to {user} failed: {e}");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
