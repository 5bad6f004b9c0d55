//! Remindr configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RemindrError, Result};

/// Environment variable that overrides `telegram.bot_token`.
pub const TOKEN_ENV: &str = "REMINDR_TELEGRAM_TOKEN";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemindrConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl RemindrConfig {
    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RemindrError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RemindrError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Write config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RemindrError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Remindr home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".remindr")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            tracing::debug!("Telegram token taken from {TOKEN_ENV}");
            self.telegram.bot_token = token.trim().to_string();
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.interval_secs == 0 {
            return Err(RemindrError::Config(
                "dispatch.interval_secs must be greater than zero".into(),
            ));
        }
        if self.telegram.send_timeout_secs == 0 {
            return Err(RemindrError::Config(
                "telegram.send_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Store path with `~` expanded.
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store.path).to_string())
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// When non-empty, only these chats may schedule reminders.
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
}

fn default_poll_interval() -> u64 { 1 }
fn default_poll_timeout() -> u64 { 30 }
fn default_send_timeout() -> u64 { 10 }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            send_timeout_secs: default_send_timeout(),
            allowed_chat_ids: vec![],
        }
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Tick period, measured from process start.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Select `due_at <= now` instead of `due_at == now`, so skipped minutes
    /// are picked up by the next tick.
    #[serde(default)]
    pub catch_up: bool,
}

fn default_interval() -> u64 { 60 }

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            catch_up: false,
        }
    }
}

/// Notification store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String { "~/.remindr/reminders.db".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

/// Reply texts sent by the update listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_welcome")]
    pub welcome: String,
    #[serde(default = "default_scheduled")]
    pub scheduled: String,
    #[serde(default = "default_invalid_format")]
    pub invalid_format: String,
    #[serde(default = "default_invalid_date")]
    pub invalid_date: String,
    #[serde(default = "default_empty_message")]
    pub empty_message: String,
    #[serde(default = "default_in_past")]
    pub in_past: String,
    #[serde(default = "default_internal_error")]
    pub internal_error: String,
}

fn default_welcome() -> String {
    "Hi! I can remind you about a planned event. \
     Send a message in the format: 01.01.2030 09:00 Event text"
        .into()
}
fn default_scheduled() -> String { "Reminder scheduled.".into() }
fn default_invalid_format() -> String {
    "Invalid message format! Use: DD.MM.YYYY HH:MM Event text".into()
}
fn default_invalid_date() -> String { "That date or time does not exist.".into() }
fn default_empty_message() -> String { "The reminder text is empty.".into() }
fn default_in_past() -> String { "That time is already in the past.".into() }
fn default_internal_error() -> String {
    "Could not save the reminder, please try again later.".into()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: default_welcome(),
            scheduled: default_scheduled(),
            invalid_format: default_invalid_format(),
            invalid_date: default_invalid_date(),
            empty_message: default_empty_message(),
            in_past: default_in_past(),
            internal_error: default_internal_error(),
        }
    }
}
