//! Inbound text → reminder. Accepts `DD.MM.YYYY HH:MM text`.

use chrono::NaiveDateTime;
use regex::Regex;
use remindr_core::types::{ChatId, NewNotification, truncate_to_minute};
use std::sync::LazyLock;
use thiserror::Error;

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

static REMINDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(\d{2}\.\d{2}\.\d{4} \d{2}:\d{2})(?:\s+(.*))?$").expect("valid regex")
});

/// Why a message could not become a reminder. Shown to the user, never
/// seen by the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("message does not match 'DD.MM.YYYY HH:MM text'")]
    InvalidFormat,

    #[error("not a valid date/time: {0}")]
    InvalidDate(String),

    #[error("reminder text is empty")]
    EmptyMessage,

    #[error("{due_at} is in the past")]
    InPast { due_at: NaiveDateTime },
}

/// A validated reminder, `due_at` minute-aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReminder {
    pub due_at: NaiveDateTime,
    pub message: String,
}

impl ParsedReminder {
    pub fn into_notification(self, chat_id: ChatId) -> NewNotification {
        NewNotification::new(chat_id, self.message, self.due_at)
    }
}

/// Parse `text` received at local time `now`.
///
/// The due minute must be later than the minute of `now`. Ticks are not
/// aligned to the wall-clock minute, so the tick for the current minute may
/// already have run and would never pick the reminder up.
pub fn parse_reminder(text: &str, now: NaiveDateTime) -> Result<ParsedReminder, IntakeError> {
    let caps = REMINDER_RE
        .captures(text.trim())
        .ok_or(IntakeError::InvalidFormat)?;

    let raw_date = &caps[1];
    let due_at = NaiveDateTime::parse_from_str(raw_date, DATE_FORMAT)
        .map(truncate_to_minute)
        .map_err(|_| IntakeError::InvalidDate(raw_date.to_string()))?;

    let message = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
    if message.is_empty() {
        return Err(IntakeError::EmptyMessage);
    }

    if due_at <= truncate_to_minute(now) {
        return Err(IntakeError::InPast { due_at });
    }

    Ok(ParsedReminder {
        due_at,
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        dt(2023, 1, 1, 0, 0, 45)
    }

    #[test]
    fn test_parse_valid() {
        let parsed = parse_reminder("15.03.2023 18:30 Buy milk", now()).unwrap();
        assert_eq!(parsed.due_at, dt(2023, 3, 15, 18, 30, 0));
        assert_eq!(parsed.message, "Buy milk");
    }

    #[test]
    fn test_parse_keeps_unicode_and_newlines() {
        let parsed = parse_reminder("  01.02.2023 07:05   Позвонить маме\nи папе  ", now()).unwrap();
        assert_eq!(parsed.message, "Позвонить маме\nи папе");
    }

    #[test]
    fn test_current_minute_is_rejected() {
        assert_eq!(
            parse_reminder("01.01.2023 00:00 Happy new year", now()),
            Err(IntakeError::InPast {
                due_at: dt(2023, 1, 1, 0, 0, 0)
            })
        );
        // Same minute, zero seconds in.
        assert!(parse_reminder("01.01.2023 00:00 x", dt(2023, 1, 1, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_next_minute_is_accepted() {
        let parsed = parse_reminder("01.01.2023 00:01 Happy new year", now()).unwrap();
        assert_eq!(parsed.due_at, dt(2023, 1, 1, 0, 1, 0));
    }

    #[test]
    fn test_invalid_format() {
        for text in ["hello", "2023-03-15 18:30 x", "15.03.23 18:30 x", "/help", ""] {
            assert_eq!(parse_reminder(text, now()), Err(IntakeError::InvalidFormat), "{text}");
        }
    }

    #[test]
    fn test_invalid_date() {
        assert_eq!(
            parse_reminder("31.02.2023 10:00 nope", now()),
            Err(IntakeError::InvalidDate("31.02.2023 10:00".into()))
        );
        assert!(matches!(
            parse_reminder("01.05.2023 25:61 nope", now()),
            Err(IntakeError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(
            parse_reminder("01.05.2023 10:00", now()),
            Err(IntakeError::EmptyMessage)
        );
        assert_eq!(
            parse_reminder("01.05.2023 10:00 \n\t ", now()),
            Err(IntakeError::EmptyMessage)
        );
    }

    #[test]
    fn test_in_past() {
        assert_eq!(
            parse_reminder("31.12.2022 23:59 too late", now()),
            Err(IntakeError::InPast {
                due_at: dt(2022, 12, 31, 23, 59, 0)
            })
        );
    }

    #[test]
    fn test_into_notification() {
        let n = parse_reminder("15.03.2023 18:30 Buy milk", now())
            .unwrap()
            .into_notification(42);
        assert_eq!(n.chat_id, 42);
        assert_eq!(n.message, "Buy milk");
        assert_eq!(n.due_at, dt(2023, 3, 15, 18, 30, 0));
    }
}
