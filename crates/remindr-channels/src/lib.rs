//! # Remindr Channels
//! Chat transport adapters. Each one implements `MessageSender` for
//! outbound delivery and exposes its own inbound update stream.

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramPollingStream};
