//! Outbound message trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChatId;

/// Delivers a text message to a chat over some transport.
///
/// Timeouts belong to the implementation; callers see them as
/// `RemindrError::Transport`.
#[async_trait]
pub trait MessageSender: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()>;
}
