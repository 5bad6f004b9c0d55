//! Domain types shared across crates.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Transport-level chat identifier (Telegram chat id).
pub type ChatId = i64;

/// A persisted reminder, pending delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Store-assigned identity.
    pub id: i64,
    /// Where to deliver the reminder.
    pub chat_id: ChatId,
    /// Reminder text, delivered verbatim.
    pub message: String,
    /// Delivery minute. Always minute-aligned.
    pub due_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

/// A reminder accepted by intake but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub chat_id: ChatId,
    pub message: String,
    pub due_at: NaiveDateTime,
}

impl NewNotification {
    /// Build a new notification. `due_at` is truncated to the minute.
    pub fn new(chat_id: ChatId, message: impl Into<String>, due_at: NaiveDateTime) -> Self {
        Self {
            chat_id,
            message: message.into(),
            due_at: truncate_to_minute(due_at),
        }
    }
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Inbound chat message, normalized from the transport's update format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Channel name ("telegram").
    pub channel: String,
    /// Chat the message came from; replies and reminders go back here.
    pub chat_id: ChatId,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_truncate_drops_seconds() {
        assert_eq!(truncate_to_minute(at(0, 0, 45)), at(0, 0, 0));
        assert_eq!(truncate_to_minute(at(13, 7, 0)), at(13, 7, 0));
    }

    #[test]
    fn test_truncate_drops_nanos() {
        let t = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_nano_opt(8, 30, 59, 999_999_999)
            .unwrap();
        assert_eq!(truncate_to_minute(t), at(8, 30, 0));
    }

    #[test]
    fn test_new_notification_is_minute_aligned() {
        let n = NewNotification::new(42, "call mom", at(0, 0, 45));
        assert_eq!(n.due_at, at(0, 0, 0));
        assert_eq!(n.chat_id, 42);
        assert_eq!(n.message, "call mom");
    }
}
