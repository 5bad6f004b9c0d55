//! Update listener — answers `/start`, turns everything else into reminders.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use remindr_core::config::MessagesConfig;
use remindr_core::traits::{Clock, MessageSender, NotificationStore};
use remindr_core::types::{ChatId, IncomingMessage, Notification};
use tokio::sync::watch;

use crate::intake::{IntakeError, parse_reminder};

/// What the listener did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    Welcomed,
    Scheduled(Notification),
    Rejected(IntakeError),
    /// Chat is not on the allowlist.
    Ignored,
    /// The store refused the insert.
    Failed,
}

pub struct UpdateListener {
    store: Arc<dyn NotificationStore>,
    sender: Arc<dyn MessageSender>,
    clock: Arc<dyn Clock>,
    messages: MessagesConfig,
    allowed_chat_ids: Vec<ChatId>,
}

impl UpdateListener {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        sender: Arc<dyn MessageSender>,
        clock: Arc<dyn Clock>,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            store,
            sender,
            clock,
            messages,
            allowed_chat_ids: Vec::new(),
        }
    }

    /// Only accept messages from these chats. Empty means everyone.
    pub fn with_allowed_chats(mut self, chat_ids: Vec<ChatId>) -> Self {
        self.allowed_chat_ids = chat_ids;
        self
    }

    /// Handle one inbound message, replying to the chat it came from.
    pub async fn handle(&self, msg: &IncomingMessage) -> ListenerOutcome {
        let chat_id = msg.chat_id;
        if !self.allowed_chat_ids.is_empty() && !self.allowed_chat_ids.contains(&chat_id) {
            tracing::debug!("Ignoring message from chat {chat_id} (not allowed)");
            return ListenerOutcome::Ignored;
        }

        if is_start_command(&msg.content) {
            self.reply(chat_id, &self.messages.welcome).await;
            return ListenerOutcome::Welcomed;
        }

        let parsed = match parse_reminder(&msg.content, self.clock.now()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Rejected message from chat {chat_id}: {e}");
                self.reply(chat_id, self.rejection_text(&e)).await;
                return ListenerOutcome::Rejected(e);
            }
        };

        match self.store.insert(&parsed.into_notification(chat_id)).await {
            Ok(saved) => {
                tracing::info!(
                    "📅 Reminder {} scheduled for chat {} at {}",
                    saved.id,
                    chat_id,
                    saved.due_at
                );
                self.reply(chat_id, &self.messages.scheduled).await;
                ListenerOutcome::Scheduled(saved)
            }
            Err(e) => {
                tracing::error!("❌ Failed to store reminder for chat {chat_id}: {e}");
                self.reply(chat_id, &self.messages.internal_error).await;
                ListenerOutcome::Failed
            }
        }
    }

    /// Consume `updates` until the stream ends or shutdown is signalled.
    /// Shutdown is checked between messages.
    pub async fn run<S>(&self, mut updates: S, mut shutdown: watch::Receiver<bool>)
    where
        S: Stream<Item = IncomingMessage> + Unpin,
    {
        tracing::info!("👂 Update listener started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                next = updates.next() => match next {
                    Some(msg) => {
                        self.handle(&msg).await;
                    }
                    None => {
                        tracing::warn!("Update stream ended");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("🛑 Update listener stopped");
    }

    fn rejection_text(&self, err: &IntakeError) -> &str {
        match err {
            IntakeError::InvalidFormat => &self.messages.invalid_format,
            IntakeError::InvalidDate(_) => &self.messages.invalid_date,
            IntakeError::EmptyMessage => &self.messages.empty_message,
            IntakeError::InPast { .. } => &self.messages.in_past,
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.sender.send(chat_id, text).await {
            tracing::warn!("⚠️ Reply to chat {chat_id} failed: {e}");
        }
    }
}

/// `/start`, also in the `/start@botname` form groups use.
fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}
