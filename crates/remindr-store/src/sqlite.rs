//! SQLite-backed notification store.
//!
//! One connection behind a mutex: intake inserts and dispatch reads/deletes
//! are serialized, so `find_due` never observes a half-written row.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use remindr_core::error::{RemindrError, Result};
use remindr_core::traits::NotificationStore;
use remindr_core::types::{NewNotification, Notification, truncate_to_minute};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::{TIMESTAMP_FORMAT, now_secs};

const SELECT_COLUMNS: &str = "SELECT id, chat_id, message, due_at, created_at FROM notification_task";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the reminder database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| store_err("DB open", e))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;").ok();
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| store_err("Busy timeout", e))?;
        Self::migrate(&conn)?;
        tracing::info!("💾 Reminder store opened: {}", path.display());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Private in-memory database, gone when the store is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| store_err("DB open", e))?;
        Self::migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS notification_task (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                message TEXT NOT NULL,
                due_at TEXT NOT NULL,        -- 'YYYY-MM-DD HH:MM:SS', minute-aligned
                created_at TEXT NOT NULL
            );

            -- Polled every tick
            CREATE INDEX IF NOT EXISTS idx_notification_task_due_at
                ON notification_task (due_at);
            ",
        )
        .map_err(|e| store_err("Migration", e))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RemindrError::Store(format!("Connection lock poisoned: {e}")))
    }

    fn query(&self, sql: &str, at: NaiveDateTime) -> Result<Vec<Notification>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(|e| store_err("Prepare", e))?;
        let rows = stmt
            .query_map([format_ts(at)], row_to_notification)
            .map_err(|e| store_err("Query", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| store_err("Read row", e))
    }
}

#[async_trait]
impl NotificationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, notification: &NewNotification) -> Result<Notification> {
        let created_at = now_secs();
        let due_at = truncate_to_minute(notification.due_at);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notification_task (chat_id, message, due_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                notification.chat_id,
                notification.message,
                format_ts(due_at),
                format_ts(created_at),
            ],
        )
        .map_err(|e| store_err("Insert", e))?;

        Ok(Notification {
            id: conn.last_insert_rowid(),
            chat_id: notification.chat_id,
            message: notification.message.clone(),
            due_at,
            created_at,
        })
    }

    async fn find_due(&self, at: NaiveDateTime) -> Result<Vec<Notification>> {
        self.query(&format!("{SELECT_COLUMNS} WHERE due_at = ?1 ORDER BY id"), at)
    }

    async fn find_due_through(&self, at: NaiveDateTime) -> Result<Vec<Notification>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE due_at <= ?1 ORDER BY due_at, id"),
            at,
        )
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM notification_task WHERE id = ?1", [id])
            .map_err(|e| store_err("Delete", e))?;
        Ok(removed > 0)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM notification_task", [], |r| r.get(0))
            .map_err(|e| store_err("Count", e))?;
        Ok(n as usize)
    }
}

fn store_err(op: &str, e: rusqlite::Error) -> RemindrError {
    RemindrError::Store(format!("{op}: {e}"))
}

fn format_ts(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let due_at: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(Notification {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        message: row.get(2)?,
        due_at: parse_ts(3, &due_at)?,
        created_at: parse_ts(4, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    fn minute(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_find_due_is_exact_match() {
        let store = SqliteStore::open_in_memory().unwrap();
        let t = minute(9, 30);
        let saved = store
            .insert(&NewNotification::new(7, "stand-up", t))
            .await
            .unwrap();

        let due = store.find_due(t).await.unwrap();
        assert_eq!(due, vec![saved]);
        assert!(store.find_due(t - ChronoDuration::minutes(1)).await.unwrap().is_empty());
        assert!(store.find_due(t + ChronoDuration::minutes(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_normalizes_seconds() {
        let store = SqliteStore::open_in_memory().unwrap();
        let with_seconds = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 45)
            .unwrap();
        let saved = store
            .insert(&NewNotification {
                chat_id: 1,
                message: "new year".into(),
                due_at: with_seconds,
            })
            .await
            .unwrap();
        assert_eq!(saved.due_at, minute(0, 0));

        let due = store.find_due(minute(0, 0)).await.unwrap();
        assert_eq!(due, vec![saved]);
    }

    #[tokio::test]
    async fn test_find_due_through_includes_overdue() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&NewNotification::new(1, "late", minute(8, 0))).await.unwrap();
        store.insert(&NewNotification::new(1, "now", minute(9, 0))).await.unwrap();
        store.insert(&NewNotification::new(1, "later", minute(10, 0))).await.unwrap();

        let due = store.find_due_through(minute(9, 0)).await.unwrap();
        let texts: Vec<_> = due.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(texts, vec!["late", "now"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let n = store
            .insert(&NewNotification::new(3, "water plants", minute(18, 0)))
            .await
            .unwrap();

        assert!(store.delete(n.id).await.unwrap());
        assert!(!store.delete(n.id).await.unwrap());
        assert!(store.find_due(minute(18, 0)).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert(&NewNotification::new(1, "a", minute(1, 0))).await.unwrap();
        let b = store.insert(&NewNotification::new(1, "b", minute(1, 0))).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = std::env::temp_dir().join("remindr-sqlite-reopen-test");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("reminders.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert(&NewNotification::new(5, "dentist", minute(14, 15)))
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let due = store.find_due(minute(14, 15)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].message, "dentist");
        assert_eq!(due[0].chat_id, 5);
        std::fs::remove_dir_all(&dir).ok();
    }
}
