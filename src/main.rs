//! # Remindr — chat reminder bot
//!
//! Send the bot `DD.MM.YYYY HH:MM text` and it sends `text` back at that minute.
//!
//! Usage:
//!   remindr                          # Run with ~/.remindr/config.toml
//!   remindr --config ./remindr.toml  # Custom config
//!   remindr --memory                 # Keep reminders in memory only
//!   remindr --init-config            # Write the default config and exit

use anyhow::{Context, Result};
use clap::Parser;
use remindr_channels::TelegramChannel;
use remindr_core::traits::{Clock, MessageSender, NotificationStore, SystemClock};
use remindr_core::RemindrConfig;
use remindr_scheduler::{DispatchOptions, Dispatcher, UpdateListener, spawn_dispatch_loop};
use remindr_store::{MemoryStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "remindr",
    version,
    about = "⏰ Remindr — schedule a chat message, get it back at the minute you asked for"
)]
struct Cli {
    /// Config file path [default: ~/.remindr/config.toml]
    #[arg(short, long)]
    config: Option<String>,

    /// Database path (overrides [store].path)
    #[arg(long)]
    db_path: Option<String>,

    /// Keep reminders in memory only (lost on exit)
    #[arg(long)]
    memory: bool,

    /// Write the default config to --config and exit
    #[arg(long)]
    init_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(RemindrConfig::default_path)
    }
}

/// Resolve once either shutdown signal fires. Returns the signal's name.
async fn wait_for_shutdown<C, T>(ctrl_c: C, terminate: T) -> &'static str
where
    C: Future<Output = std::io::Result<()>>,
    T: Future<Output = ()>,
{
    tokio::select! {
        res = ctrl_c => {
            if let Err(e) = res {
                tracing::warn!("⚠️ Ctrl-C handler failed: {e}");
            }
            "Ctrl-C"
        }
        _ = terminate => "SIGTERM",
    }
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(e) => {
            tracing::warn!("⚠️ Cannot listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "remindr=debug,remindr_scheduler=debug,remindr_store=debug,remindr_channels=debug,remindr_core=debug"
    } else {
        "remindr=info,remindr_scheduler=info,remindr_store=info,remindr_channels=info,remindr_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli.config_path();

    // --init-config: write defaults and exit
    if cli.init_config {
        if config_path.exists() {
            println!("⚠️  Config already exists: {}", config_path.display());
        } else {
            RemindrConfig::default().save_to(&config_path)?;
            println!("✅ Default config written to {}", config_path.display());
            println!("   Set telegram.bot_token (or REMINDR_TELEGRAM_TOKEN) before starting.");
        }
        return Ok(());
    }

    let mut config = if config_path.exists() {
        RemindrConfig::load_from(&config_path)?
    } else {
        tracing::warn!("Config {} not found, using defaults", config_path.display());
        RemindrConfig::default()
    };
    config.apply_env_overrides();
    if let Some(db_path) = &cli.db_path {
        config.store.path = db_path.clone();
    }
    config.validate()?;

    if config.telegram.bot_token.is_empty() {
        anyhow::bail!(
            "No Telegram bot token. Set telegram.bot_token in {} or {}",
            config_path.display(),
            remindr_core::config::TOKEN_ENV
        );
    }

    // Store
    let store: Arc<dyn NotificationStore> = if cli.memory {
        tracing::warn!("⚠️  In-memory store: reminders are lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let path = config.store_path();
        Arc::new(SqliteStore::open(&path).with_context(|| format!("opening {}", path.display()))?)
    };
    tracing::info!("💾 {} pending reminder(s) in {} store", store.count().await?, store.name());

    // Transport
    let telegram = TelegramChannel::new(config.telegram.clone());
    let me = telegram.get_me().await.context("connecting to Telegram")?;
    tracing::info!(
        "🤖 Telegram bot: @{} ({})",
        me.username.as_deref().unwrap_or("unknown"),
        me.first_name
    );
    let sender: Arc<dyn MessageSender> = Arc::new(telegram.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Dispatch loop
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        sender.clone(),
        clock.clone(),
        DispatchOptions {
            catch_up: config.dispatch.catch_up,
        },
    ));
    let dispatch_handle = spawn_dispatch_loop(
        dispatcher,
        Duration::from_secs(config.dispatch.interval_secs),
        shutdown_rx.clone(),
    );

    // Update listener
    let listener = UpdateListener::new(store, sender, clock, config.messages.clone())
        .with_allowed_chats(config.telegram.allowed_chat_ids.clone());
    let updates = telegram.start_polling();
    let listener_handle = tokio::spawn(async move {
        listener.run(updates, shutdown_rx).await;
    });

    println!("⏰ Remindr v{}", env!("CARGO_PKG_VERSION"));
    println!("   Press Ctrl+C to stop");

    let signal = wait_for_shutdown(tokio::signal::ctrl_c(), sigterm()).await;
    tracing::info!("🛑 {signal} received, shutting down...");
    shutdown_tx.send(true).ok();

    // Let an in-flight tick finish its due set.
    let (dispatch_res, listener_res) = tokio::join!(dispatch_handle, listener_handle);
    dispatch_res?;
    listener_res?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_defaults_to_home() {
        let cli = Cli::parse_from(["remindr"]);
        assert_eq!(cli.config_path(), RemindrConfig::default_path());

        let cli = Cli::parse_from(["remindr", "--config", "/etc/remindr.toml"]);
        assert_eq!(cli.config_path(), PathBuf::from("/etc/remindr.toml"));
    }

    #[tokio::test]
    async fn test_sigterm_triggers_shutdown() {
        let signal = wait_for_shutdown(std::future::pending(), async {}).await;
        assert_eq!(signal, "SIGTERM");
    }

    #[tokio::test]
    async fn test_ctrl_c_triggers_shutdown() {
        let signal = wait_for_shutdown(async { Ok(()) }, std::future::pending()).await;
        assert_eq!(signal, "Ctrl-C");
    }
}
