//! In-memory notification store. Nothing survives a restart.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use remindr_core::error::{RemindrError, Result};
use remindr_core::traits::NotificationStore;
use remindr_core::types::{NewNotification, Notification, truncate_to_minute};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::now_secs;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    // Keyed by id, so iteration order is insertion order.
    items: BTreeMap<i64, Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| RemindrError::Store(format!("Memory store lock poisoned: {e}")))
    }

    fn select<F>(&self, pred: F) -> Result<Vec<Notification>>
    where
        F: Fn(&Notification) -> bool,
    {
        let state = self.lock()?;
        Ok(state.items.values().filter(|n| pred(n)).cloned().collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, notification: &NewNotification) -> Result<Notification> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let saved = Notification {
            id: state.next_id,
            chat_id: notification.chat_id,
            message: notification.message.clone(),
            due_at: truncate_to_minute(notification.due_at),
            created_at: now_secs(),
        };
        state.items.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn find_due(&self, at: NaiveDateTime) -> Result<Vec<Notification>> {
        self.select(|n| n.due_at == at)
    }

    async fn find_due_through(&self, at: NaiveDateTime) -> Result<Vec<Notification>> {
        let mut due = self.select(|n| n.due_at <= at)?;
        due.sort_by_key(|n| (n.due_at, n.id));
        Ok(due)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.items.remove(&id).is_some())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.lock()?.items.len())
    }
}
