//! Quiet hour write path.
//!
//! [`WindowService`] is the only way windows get created or edited: it
//! validates the payload, runs the overlap check, and only then hands the
//! row to the store. The store re-checks overlap atomically, so two racing
//! writes that both passed the read-side check still cannot both commit.

use std::sync::Arc;

use quiet_core::error::CoreError;
use quiet_core::quiet_hour::QuietHourInput;
use quiet_core::types::{DbId, Timestamp};

use crate::models::quiet_hour::QuietHour;
use crate::overlap;
use crate::store::{StoreError, WindowStore};

const ENTITY: &str = "QuietHour";

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WindowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Overlap => Self::Core(overlap::conflict_error(None)),
            other => Self::Store(other),
        }
    }
}

fn not_found(id: DbId) -> WindowError {
    WindowError::Core(CoreError::NotFound { entity: ENTITY, id })
}

#[derive(Clone)]
pub struct WindowService {
    store: Arc<dyn WindowStore>,
}

impl WindowService {
    pub fn new(store: Arc<dyn WindowStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn WindowStore> {
        &self.store
    }

    /// Validate and persist a new window for `user_id`.
    pub async fn create(
        &self,
        user_id: DbId,
        input: &QuietHourInput,
        now: Timestamp,
    ) -> Result<QuietHour, WindowError> {
        let valid = input.validate_for_create(now)?;
        overlap::validate(
            self.store.as_ref(),
            user_id,
            valid.start_time,
            valid.end_time,
            None,
        )
        .await?;

        let created = self
            .store
            .upsert(user_id, None, &valid)
            .await?
            .ok_or_else(|| CoreError::Internal("insert returned no row".into()))?;

        tracing::info!(
            window_id = created.id,
            user_id,
            start_time = %created.start_time,
            "Quiet hour created"
        );
        Ok(created)
    }

    /// Replace the editable fields of an existing window.
    ///
    /// The window is re-validated against all *other* active windows of the
    /// owner. Notification bookkeeping is kept as is.
    pub async fn update(
        &self,
        user_id: DbId,
        id: DbId,
        input: &QuietHourInput,
    ) -> Result<QuietHour, WindowError> {
        let valid = input.validate_for_update()?;

        if self.store.find_by_id(user_id, id).await?.is_none() {
            return Err(not_found(id));
        }
        overlap::validate(
            self.store.as_ref(),
            user_id,
            valid.start_time,
            valid.end_time,
            Some(id),
        )
        .await?;

        let updated = self
            .store
            .upsert(user_id, Some(id), &valid)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!(window_id = id, user_id, "Quiet hour updated");
        Ok(updated)
    }

    pub async fn get(&self, user_id: DbId, id: DbId) -> Result<QuietHour, WindowError> {
        self.store
            .find_by_id(user_id, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn list(&self, user_id: DbId) -> Result<Vec<QuietHour>, WindowError> {
        Ok(self.store.list_active(user_id).await?)
    }

    /// Soft-delete a window. The row stays for auditing but no longer takes
    /// part in overlap checks or sweeps.
    pub async fn cancel(&self, user_id: DbId, id: DbId) -> Result<(), WindowError> {
        if !self.store.soft_delete(user_id, id).await? {
            return Err(not_found(id));
        }
        tracing::info!(window_id = id, user_id, "Quiet hour cancelled");
        Ok(())
    }
}
