//! Log-only channel, used when SMTP is not configured.

use async_trait::async_trait;
use quiet_db::models::quiet_hour::QuietHour;

use super::message::Reminder;
use super::{DeliveryAdapter, DeliveryError};
use crate::contacts::Recipient;

/// Writes the reminder to the log and reports success, so windows are still
/// marked notified in deployments without a mail server.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyDelivery;

#[async_trait]
impl DeliveryAdapter for LogOnlyDelivery {
    async fn deliver(
        &self,
        recipient: &Recipient,
        window: &QuietHour,
    ) -> Result<(), DeliveryError> {
        let reminder = Reminder::for_window(window);
        tracing::info!(
            window_id = window.id,
            user_id = recipient.user_id,
            to = %recipient.email,
            subject = %reminder.subject,
            "Reminder not emailed (SMTP not configured)"
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}
