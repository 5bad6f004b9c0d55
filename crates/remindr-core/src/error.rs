//! Error types for Remindr.

use thiserror::Error;

/// Errors raised by the store, the transport and the config layer.
#[derive(Debug, Error)]
pub enum RemindrError {
    /// Message delivery failed: network, rejected recipient, rate limit or timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Query, insert or delete against the notification store failed.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemindrError {
    /// Whether this error came from the chat transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemindrError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, RemindrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RemindrError::Transport("chat not found".into());
        assert_eq!(err.to_string(), "Transport error: chat not found");
        assert!(err.is_transport());
        assert!(!RemindrError::Store("locked".into()).is_transport());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RemindrError = io.into();
        assert!(matches!(err, RemindrError::Io(_)));
    }
}
