//! Dispatch loop — once per tick, deliver every reminder due at the current
//! minute and remove it from the store.
//!
//! Delivery policy is delete-and-continue: a failed send is logged and the
//! reminder is still deleted, so permanently undeliverable entries never pile
//! up. A crash between send and delete may resend; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use remindr_core::traits::{Clock, MessageSender, NotificationStore};
use remindr_core::types::{Notification, truncate_to_minute};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// How the due set is selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// `due_at <= now` instead of `due_at == now`.
    pub catch_up: bool,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Minute-aligned tick time.
    pub at: NaiveDateTime,
    pub selected: usize,
    pub sent: usize,
    pub failed_sends: usize,
    pub deleted: usize,
    pub failed_deletes: usize,
    /// The due-set query itself failed; nothing was processed.
    pub query_failed: bool,
}

impl TickReport {
    fn new(at: NaiveDateTime) -> Self {
        Self {
            at,
            selected: 0,
            sent: 0,
            failed_sends: 0,
            deleted: 0,
            failed_deletes: 0,
            query_failed: false,
        }
    }

    /// Nothing was due (and the query succeeded).
    pub fn is_idle(&self) -> bool {
        self.selected == 0 && !self.query_failed
    }
}

/// Stateless between ticks: all reminder state lives in the store.
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    sender: Arc<dyn MessageSender>,
    clock: Arc<dyn Clock>,
    options: DispatchOptions,
    // Held for the whole tick, sends and deletes included.
    tick_guard: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        sender: Arc<dyn MessageSender>,
        clock: Arc<dyn Clock>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            store,
            sender,
            clock,
            options,
            tick_guard: Mutex::new(()),
        }
    }

    /// Run one tick at the clock's current minute.
    pub async fn tick(&self) -> TickReport {
        let now = truncate_to_minute(self.clock.now());
        self.tick_at(now).await
    }

    /// Run one tick at `now` (expected minute-aligned).
    ///
    /// Concurrent calls are serialized: a second tick does not query the
    /// store until the first one has finished all its sends and deletes.
    pub async fn tick_at(&self, now: NaiveDateTime) -> TickReport {
        let _guard = self.tick_guard.lock().await;
        let mut report = TickReport::new(now);

        let selected = if self.options.catch_up {
            self.store.find_due_through(now).await
        } else {
            self.store.find_due(now).await
        };

        let due = match selected {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("❌ Due-set query failed for {now}: {e}");
                report.query_failed = true;
                return report;
            }
        };

        report.selected = due.len();
        if due.is_empty() {
            tracing::trace!("No reminders due at {now}");
            return report;
        }

        tracing::info!("🔔 {} reminder(s) due at {}", due.len(), now);
        for notification in &due {
            self.deliver(notification, &mut report).await;
        }

        tracing::info!(
            "✅ Tick {}: sent {}/{}, deleted {}/{}",
            now,
            report.sent,
            report.selected,
            report.deleted,
            report.selected
        );
        report
    }

    /// Send, then delete regardless of the send outcome.
    async fn deliver(&self, notification: &Notification, report: &mut TickReport) {
        match self
            .sender
            .send(notification.chat_id, &notification.message)
            .await
        {
            Ok(()) => {
                report.sent += 1;
                tracing::info!(
                    "📣 Reminder {} delivered to chat {} via {}",
                    notification.id,
                    notification.chat_id,
                    self.sender.name()
                );
            }
            Err(e) => {
                report.failed_sends += 1;
                tracing::warn!(
                    "⚠️ Reminder {} to chat {} not delivered, dropping it: {e}",
                    notification.id,
                    notification.chat_id
                );
            }
        }

        match self.store.delete(notification.id).await {
            Ok(removed) => {
                report.deleted += 1;
                if !removed {
                    tracing::debug!("Reminder {} was already gone", notification.id);
                }
            }
            Err(e) => {
                report.failed_deletes += 1;
                tracing::warn!("⚠️ Failed to delete reminder {}: {e}", notification.id);
            }
        }
    }
}

/// Spawn the dispatch loop as a background tokio task.
///
/// The first tick fires immediately, then every `period` from process start.
/// Shutdown is observed between ticks only, so an in-flight tick always
/// finishes its due set.
pub fn spawn_dispatch_loop(
    dispatcher: Arc<Dispatcher>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            "⏰ Dispatch loop started (tick every {}s, {} selection)",
            period.as_secs(),
            if dispatcher.options.catch_up { "catch-up" } else { "exact-minute" }
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            let report = dispatcher.tick().await;
            if report.is_idle() {
                tracing::debug!("Tick {}: nothing due", report.at);
            }
        }

        tracing::info!("🛑 Dispatch loop stopped");
    })
}
