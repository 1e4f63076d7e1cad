//! The window store contract.
//!
//! [`WindowStore`] is everything the write service and the notification
//! sweeper need from persistence: owner-scoped CRUD, range scans, and the
//! compare-and-set claim. [`PgWindowStore`] backs it with Postgres;
//! [`MemoryWindowStore`] keeps the same semantics behind a mutex for tests
//! and local runs.

use async_trait::async_trait;
use quiet_core::notification::{AttemptFailure, NotificationState};
use quiet_core::quiet_hour::ValidQuietHour;
use quiet_core::types::{ClaimToken, DbId, Timestamp};

use crate::models::quiet_hour::QuietHour;

pub mod memory;
pub mod postgres;

pub use memory::MemoryWindowStore;
pub use postgres::PgWindowStore;

/// PostgreSQL `exclusion_violation`.
const PG_EXCLUSION_VIOLATION: &str = "23P01";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Store failures. Everything except [`StoreError::Overlap`] is transient:
/// the caller may retry the whole operation later.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query execution failed (connection, timeout, constraint, ...).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The write would have produced two overlapping active windows.
    #[error("Window overlaps an existing active window")]
    Overlap,

    /// The backing store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Translate write errors, surfacing exclusion-constraint violations as
    /// [`StoreError::Overlap`].
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(PG_EXCLUSION_VIOLATION) {
                return Self::Overlap;
            }
        }
        Self::Database(err)
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Active windows of `user_id` intersecting `[start, end)`, skipping
    /// `exclude_id`.
    async fn find_active_overlapping(
        &self,
        user_id: DbId,
        start: Timestamp,
        end: Timestamp,
        exclude_id: Option<DbId>,
    ) -> Result<Vec<QuietHour>, StoreError>;

    /// Active, unnotified, not permanently failed windows with
    /// `window_start <= start_time <= window_end`.
    async fn find_due_unnotified(
        &self,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<QuietHour>, StoreError>;

    /// Like [`Self::find_due_unnotified`] but over `after < start_time <= until`,
    /// and only windows with a prior failed attempt or a claim taken before
    /// `stale_before`.
    async fn find_pending_retries(
        &self,
        after: Timestamp,
        until: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Vec<QuietHour>, StoreError>;

    /// Compare-and-set claim. `true` iff this call now owns the window.
    /// Claims taken before `stale_before` count as abandoned.
    async fn claim_for_notification(
        &self,
        id: DbId,
        token: ClaimToken,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Record a successful delivery. `true` iff `token` still held the claim.
    async fn mark_notified(
        &self,
        id: DbId,
        token: ClaimToken,
        at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Drop the claim held by `token`, counting `failure` against the retry
    /// budget when given. Returns the resulting state, or `None` when the
    /// token no longer matched.
    async fn release_claim(
        &self,
        id: DbId,
        token: ClaimToken,
        failure: Option<&AttemptFailure>,
        max_attempts: i32,
    ) -> Result<Option<NotificationState>, StoreError>;

    /// Insert (`id == None`) or replace the editable fields of an active
    /// window owned by `user_id`. `Ok(None)` when `id` is missing, foreign or
    /// inactive. Fails with [`StoreError::Overlap`] if the write would break
    /// the no-overlap invariant.
    async fn upsert(
        &self,
        user_id: DbId,
        id: Option<DbId>,
        fields: &ValidQuietHour,
    ) -> Result<Option<QuietHour>, StoreError>;

    /// Deactivate an active window owned by `user_id`.
    async fn soft_delete(&self, user_id: DbId, id: DbId) -> Result<bool, StoreError>;

    /// An active window owned by `user_id`.
    async fn find_by_id(&self, user_id: DbId, id: DbId) -> Result<Option<QuietHour>, StoreError>;

    /// All active windows of `user_id`, earliest first.
    async fn list_active(&self, user_id: DbId) -> Result<Vec<QuietHour>, StoreError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn non_database_errors_stay_database_errors() {
        let err = StoreError::from_write(sqlx::Error::RowNotFound);
        assert_matches!(err, StoreError::Database(sqlx::Error::RowNotFound));
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            StoreError::Overlap.to_string(),
            "Window overlaps an existing active window"
        );
        assert_eq!(
            StoreError::Unavailable("down".into()).to_string(),
            "Store unavailable: down"
        );
    }
}
