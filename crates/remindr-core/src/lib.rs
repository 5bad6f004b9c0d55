//! # Remindr Core
//!
//! Shared vocabulary for the reminder service: the `Notification` model,
//! the collaborator traits the dispatch loop depends on, the error
//! taxonomy and the TOML configuration.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::RemindrConfig;
pub use error::{RemindrError, Result};
pub use traits::{Clock, MessageSender, NotificationStore, SystemClock};
pub use types::{ChatId, IncomingMessage, NewNotification, Notification};
