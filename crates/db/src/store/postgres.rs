//! Postgres-backed [`WindowStore`].

use async_trait::async_trait;
use quiet_core::notification::{AttemptFailure, NotificationState};
use quiet_core::quiet_hour::ValidQuietHour;
use quiet_core::types::{ClaimToken, DbId, Timestamp};

use super::{StoreError, WindowStore};
use crate::models::quiet_hour::QuietHour;
use crate::repositories::QuietHourRepo;
use crate::DbPool;

/// [`WindowStore`] over a Postgres pool, delegating to [`QuietHourRepo`].
#[derive(Clone)]
pub struct PgWindowStore {
    pool: DbPool,
}

impl PgWindowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl WindowStore for PgWindowStore {
    async fn find_active_overlapping(
        &self,
        user_id: DbId,
        start: Timestamp,
        end: Timestamp,
        exclude_id: Option<DbId>,
    ) -> Result<Vec<QuietHour>, StoreError> {
        Ok(
            QuietHourRepo::find_active_overlapping(&self.pool, user_id, start, end, exclude_id)
                .await?,
        )
    }

    async fn find_due_unnotified(
        &self,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<QuietHour>, StoreError> {
        Ok(QuietHourRepo::find_due_unnotified(&self.pool, window_start, window_end).await?)
    }

    async fn find_pending_retries(
        &self,
        after: Timestamp,
        until: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Vec<QuietHour>, StoreError> {
        Ok(QuietHourRepo::find_pending_retries(&self.pool, after, until, stale_before).await?)
    }

    async fn claim_for_notification(
        &self,
        id: DbId,
        token: ClaimToken,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(QuietHourRepo::claim(&self.pool, id, token, now, stale_before).await?)
    }

    async fn mark_notified(
        &self,
        id: DbId,
        token: ClaimToken,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(QuietHourRepo::mark_notified(&self.pool, id, token, at).await?)
    }

    async fn release_claim(
        &self,
        id: DbId,
        token: ClaimToken,
        failure: Option<&AttemptFailure>,
        max_attempts: i32,
    ) -> Result<Option<NotificationState>, StoreError> {
        let row =
            QuietHourRepo::release_claim(&self.pool, id, token, failure, max_attempts).await?;
        Ok(row.map(|(is_notified, failed)| NotificationState::from_flags(is_notified, false, failed)))
    }

    async fn upsert(
        &self,
        user_id: DbId,
        id: Option<DbId>,
        fields: &ValidQuietHour,
    ) -> Result<Option<QuietHour>, StoreError> {
        match id {
            None => QuietHourRepo::create(&self.pool, user_id, fields)
                .await
                .map(Some)
                .map_err(StoreError::from_write),
            Some(id) => QuietHourRepo::update(&self.pool, user_id, id, fields)
                .await
                .map_err(StoreError::from_write),
        }
    }

    async fn soft_delete(&self, user_id: DbId, id: DbId) -> Result<bool, StoreError> {
        Ok(QuietHourRepo::soft_delete(&self.pool, user_id, id).await?)
    }

    async fn find_by_id(&self, user_id: DbId, id: DbId) -> Result<Option<QuietHour>, StoreError> {
        Ok(QuietHourRepo::find_by_id(&self.pool, user_id, id).await?)
    }

    async fn list_active(&self, user_id: DbId) -> Result<Vec<QuietHour>, StoreError> {
        Ok(QuietHourRepo::list_active(&self.pool, user_id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
