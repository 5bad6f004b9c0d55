//! # Remindr Store
//! Notification store backends.
//!
//! - `SqliteStore`: durable, indexed on `due_at`, survives restarts
//! - `MemoryStore`: process-local, for tests and throwaway runs

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{NaiveDateTime, Timelike};

/// On-disk timestamp format. Lexical order equals chronological order.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall clock at second precision, as stored in `created_at`.
pub(crate) fn now_secs() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
