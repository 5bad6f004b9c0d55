//! # Remindr Scheduler
//!
//! Turns chat messages into stored reminders and delivers them at their minute.
//!
//! ## Architecture
//! ```text
//! Telegram polling ──▶ UpdateListener ──▶ intake::parse_reminder
//!                                              │
//!                                              ▼
//!                                      NotificationStore
//!                                              ▲
//! tokio interval (1 min) ──▶ Dispatcher::tick ─┘──▶ MessageSender
//!                             find_due(now) → send → delete
//! ```
//!
//! Ticks never overlap: the loop awaits each tick before the next timer
//! fire, and the dispatcher serializes ticks behind an async mutex.

pub mod dispatch;
pub mod intake;
pub mod listener;

pub use dispatch::{DispatchOptions, Dispatcher, TickReport, spawn_dispatch_loop};
pub use intake::{IntakeError, ParsedReminder, parse_reminder};
pub use listener::{ListenerOutcome, UpdateListener};
