//! Collaborator traits the dispatch loop and the listener depend on.

pub mod clock;
pub mod sender;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use sender::MessageSender;
pub use store::NotificationStore;
