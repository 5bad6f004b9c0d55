//! Notification store trait.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::types::{NewNotification, Notification};

/// Durable keyed collection of pending notifications.
///
/// Implementations must make an insert visible either completely or not at
/// all to a concurrent `find_due`.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Persist a new notification and return it with its assigned id.
    async fn insert(&self, notification: &NewNotification) -> Result<Notification>;

    /// All notifications whose `due_at` equals `at` exactly.
    async fn find_due(&self, at: NaiveDateTime) -> Result<Vec<Notification>>;

    /// All notifications whose `due_at` is at or before `at`.
    async fn find_due_through(&self, at: NaiveDateTime) -> Result<Vec<Notification>>;

    /// Remove by identity. Returns `Ok(false)` when the id was already gone.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Number of pending notifications.
    async fn count(&self) -> Result<usize>;
}
