//! Quiet hour entity model.

use quiet_core::notification::NotificationState;
use quiet_core::types::{ClaimToken, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `quiet_hours` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuietHour {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub is_active: bool,
    pub is_notified: bool,
    pub notified_at: Option<Timestamp>,
    /// Internal to the sweeper; never exposed to clients.
    #[serde(skip_serializing)]
    pub claim_token: Option<ClaimToken>,
    pub claimed_at: Option<Timestamp>,
    pub delivery_attempts: i32,
    pub last_delivery_error: Option<String>,
    pub delivery_failed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QuietHour {
    pub fn notification_state(&self) -> NotificationState {
        NotificationState::from_flags(
            self.is_notified,
            self.claim_token.is_some(),
            self.delivery_failed_at.is_some(),
        )
    }

    /// Length of the window in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}
