//! Outbound reminder channels.
//!
//! The sweeper only sees [`DeliveryAdapter`]; whether a reminder goes out by
//! SMTP or just to the log is decided once at startup.

use std::time::Duration;

use async_trait::async_trait;
use quiet_db::models::quiet_hour::QuietHour;

use crate::contacts::Recipient;

pub mod email;
pub mod log;
pub mod message;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Worth trying again later (connection refused, 4xx SMTP reply, ...).
    #[error("Delivery failed: {0}")]
    Retryable(String),

    /// Retrying cannot help (malformed address, 5xx SMTP reply, ...).
    #[error("Delivery rejected: {0}")]
    Permanent(String),

    /// The adapter did not answer within the delivery timeout.
    #[error("Delivery timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent(_))
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DeliveryAdapter: Send + Sync {
    /// Send the reminder for `window` to `recipient`.
    async fn deliver(&self, recipient: &Recipient, window: &QuietHour)
        -> Result<(), DeliveryError>;

    /// Short channel name for logs.
    fn channel(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_permanent_errors_are_final() {
        assert!(DeliveryError::Retryable("busy".into()).is_retryable());
        assert!(DeliveryError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!DeliveryError::Permanent("no such mailbox".into()).is_retryable());
    }

    #[test]
    fn timeout_display_in_seconds() {
        assert_eq!(
            DeliveryError::Timeout(Duration::from_secs(30)).to_string(),
            "Delivery timed out after 30s"
        );
    }
}
