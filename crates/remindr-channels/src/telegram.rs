//! Telegram Bot channel — long polling + message sending via Bot API.

use async_trait::async_trait;
use futures::stream::Stream;
use remindr_core::config::TelegramConfig;
use remindr_core::error::{RemindrError, Result};
use remindr_core::traits::MessageSender;
use remindr_core::types::{ChatId, IncomingMessage};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Back-off after a failed `getUpdates`.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Telegram Bot channel. Cheap to clone; clones share the HTTP client.
#[derive(Clone)]
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.into(),
        }
    }

    /// Point the channel at a different Bot API host (local Bot API server, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.config.bot_token, method)
    }

    /// Client-side deadline for one `getUpdates` call: the server-side long
    /// poll plus 10 seconds of slack.
    fn poll_request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.poll_timeout_secs.saturating_add(10))
    }

    /// Get updates after `offset` using long polling.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        let poll_timeout = self.config.poll_timeout_secs;
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", poll_timeout.to_string()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .timeout(self.poll_request_timeout())
            .send()
            .await
            .map_err(|e| RemindrError::Transport(format!("Telegram getUpdates failed: {e}")))?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| RemindrError::Transport(format!("Invalid Telegram response: {e}")))?;

        body.into_result("getUpdates")
            .map(|updates| updates.unwrap_or_default())
    }

    /// Send a plain-text message. User text goes out verbatim, no parse mode.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .timeout(Duration::from_secs(self.config.send_timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemindrError::Transport(format!("sendMessage timed out: {e}"))
                } else {
                    RemindrError::Transport(format!("sendMessage failed: {e}"))
                }
            })?;

        let result: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| RemindrError::Transport(format!("Invalid send response: {e}")))?;

        result.into_result("sendMessage").map(|_| ())
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .timeout(Duration::from_secs(self.config.send_timeout_secs))
            .send()
            .await
            .map_err(|e| RemindrError::Transport(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| RemindrError::Transport(format!("Invalid getMe response: {e}")))?;
        body.into_result("getMe")?
            .ok_or_else(|| RemindrError::Transport("No bot info".into()))
    }

    /// Start the polling loop — returns a stream of IncomingMessages.
    /// The loop stops when the stream is dropped.
    pub fn start_polling(&self) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = self.clone();

        let task = tokio::spawn(async move {
            tracing::info!("Telegram polling loop started");
            let mut last_update_id = 0i64;

            loop {
                match channel.get_updates(last_update_id + 1).await {
                    Ok(updates) => {
                        for update in updates {
                            last_update_id = last_update_id.max(update.update_id);
                            let Some(msg) = update.to_incoming() else {
                                continue;
                            };
                            if tx.send(msg).is_err() {
                                tracing::info!("Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Telegram polling error: {e}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    }
                }

                tokio::time::sleep(Duration::from_secs(channel.config.poll_interval_secs)).await;
            }
        });

        TelegramPollingStream { rx, task }
    }
}

/// Stream of incoming Telegram messages from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<IncomingMessage>,
    task: tokio::task::JoinHandle<()>,
}

impl Stream for TelegramPollingStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for TelegramPollingStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl MessageSender for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

impl<T> TelegramApiResponse<T> {
    fn into_result(self, method: &str) -> Result<Option<T>> {
        if self.ok {
            return Ok(self.result);
        }
        Err(RemindrError::Transport(format!(
            "Telegram {method} error {}: {}",
            self.error_code.unwrap_or_default(),
            self.description.unwrap_or_default()
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

impl TelegramUpdate {
    /// Convert to an IncomingMessage. Non-text and bot-authored updates yield None.
    pub fn to_incoming(&self) -> Option<IncomingMessage> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_ref()?;
        let from = msg.from.as_ref()?;

        if from.is_bot {
            return None;
        }

        Some(IncomingMessage {
            channel: "telegram".into(),
            chat_id: msg.chat.id,
            sender_id: from.id.to_string(),
            sender_name: Some(format!(
                "{}{}",
                from.first_name,
                from.last_name
                    .as_deref()
                    .map(|l| format!(" {l}"))
                    .unwrap_or_default()
            )),
            content: text.clone(),
            timestamp: chrono::DateTime::from_timestamp(msg.date, 0)
                .unwrap_or_else(chrono::Utc::now),
        })
    }
}
