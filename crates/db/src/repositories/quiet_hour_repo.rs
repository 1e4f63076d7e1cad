//! Repository for the `quiet_hours` table.
//!
//! Owner-scoped reads and writes for the HTTP API plus the claim protocol
//! used by the notification sweeper. Every sweeper write is a single
//! conditional `UPDATE`, so concurrent sweeps and replicas coordinate
//! through row locks alone.

use quiet_core::notification::AttemptFailure;
use quiet_core::quiet_hour::ValidQuietHour;
use quiet_core::types::{ClaimToken, DbId, Timestamp};
use sqlx::PgPool;

use crate::models::quiet_hour::QuietHour;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, user_id, title, description, start_time, end_time, is_active, \
    is_notified, notified_at, claim_token, claimed_at, \
    delivery_attempts, last_delivery_error, delivery_failed_at, \
    created_at, updated_at";

/// Predicate shared by every scan the sweeper runs.
const SWEEPABLE: &str = "is_active AND NOT is_notified AND delivery_failed_at IS NULL";

/// Provides CRUD and claim operations for quiet hours.
pub struct QuietHourRepo;

impl QuietHourRepo {
    /// Insert a new window for `user_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &ValidQuietHour,
    ) -> Result<QuietHour, sqlx::Error> {
        let query = format!(
            "INSERT INTO quiet_hours (user_id, title, description, start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuietHour>(&query)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.start_time)
            .bind(input.end_time)
            .fetch_one(pool)
            .await
    }

    /// Replace the editable fields of an active window owned by `user_id`.
    ///
    /// Returns `None` if the window does not exist, belongs to someone else,
    /// or has been soft-deleted. Notification bookkeeping is left untouched.
    pub async fn update(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
        input: &ValidQuietHour,
    ) -> Result<Option<QuietHour>, sqlx::Error> {
        let query = format!(
            "UPDATE quiet_hours SET \
                title = $3, description = $4, start_time = $5, end_time = $6, \
                updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuietHour>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.start_time)
            .bind(input.end_time)
            .fetch_optional(pool)
            .await
    }

    /// Find an active window owned by `user_id`.
    pub async fn find_by_id(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
    ) -> Result<Option<QuietHour>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quiet_hours WHERE id = $1 AND user_id = $2 AND is_active"
        );
        sqlx::query_as::<_, QuietHour>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's active windows, earliest first.
    pub async fn list_active(pool: &PgPool, user_id: DbId) -> Result<Vec<QuietHour>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quiet_hours \
             WHERE user_id = $1 AND is_active \
             ORDER BY start_time ASC"
        );
        sqlx::query_as::<_, QuietHour>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Soft-delete a window. Returns `true` if an active owned row was deactivated.
    pub async fn soft_delete(pool: &PgPool, user_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE quiet_hours SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_active",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Active windows of `user_id` intersecting `[start, end)`, optionally
    /// ignoring `exclude_id` (the window being edited).
    pub async fn find_active_overlapping(
        pool: &PgPool,
        user_id: DbId,
        start: Timestamp,
        end: Timestamp,
        exclude_id: Option<DbId>,
    ) -> Result<Vec<QuietHour>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quiet_hours \
             WHERE user_id = $1 AND is_active \
               AND start_time < $3 AND end_time > $2 \
               AND ($4::BIGINT IS NULL OR id <> $4) \
             ORDER BY start_time ASC"
        );
        sqlx::query_as::<_, QuietHour>(&query)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .bind(exclude_id)
            .fetch_all(pool)
            .await
    }

    /// Sweepable windows whose start falls in `[from, to]`.
    pub async fn find_due_unnotified(
        pool: &PgPool,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<QuietHour>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quiet_hours \
             WHERE {SWEEPABLE} AND start_time >= $1 AND start_time <= $2 \
             ORDER BY start_time ASC"
        );
        sqlx::query_as::<_, QuietHour>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Sweepable windows whose start falls in `(after, to]` and that either
    /// failed an earlier attempt or hold a claim taken before `stale_before`.
    pub async fn find_pending_retries(
        pool: &PgPool,
        after: Timestamp,
        to: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Vec<QuietHour>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quiet_hours \
             WHERE {SWEEPABLE} \
               AND (delivery_attempts > 0 \
                    OR (claim_token IS NOT NULL AND claimed_at < $3)) \
               AND start_time > $1 AND start_time <= $2 \
             ORDER BY start_time ASC"
        );
        sqlx::query_as::<_, QuietHour>(&query)
            .bind(after)
            .bind(to)
            .bind(stale_before)
            .fetch_all(pool)
            .await
    }

    /// Atomically claim a window for delivery.
    ///
    /// Succeeds only when the window is sweepable and either unclaimed or
    /// holding a claim taken before `stale_before`. Under concurrent callers
    /// Postgres re-evaluates the predicate after the row lock is released, so
    /// at most one of them sees a row affected.
    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        token: ClaimToken,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE quiet_hours SET claim_token = $2, claimed_at = $3 \
             WHERE id = $1 AND {SWEEPABLE} \
               AND (claim_token IS NULL OR claimed_at < $4)"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(token)
            .bind(now)
            .bind(stale_before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip `is_notified` for a window still claimed by `token`.
    pub async fn mark_notified(
        pool: &PgPool,
        id: DbId,
        token: ClaimToken,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE quiet_hours SET \
                is_notified = TRUE, notified_at = $3, \
                claim_token = NULL, claimed_at = NULL \
             WHERE id = $1 AND claim_token = $2 AND NOT is_notified",
        )
        .bind(id)
        .bind(token)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop the claim held by `token`.
    ///
    /// When `failure` is given the attempt counter is incremented, the message
    /// recorded, and `delivery_failed_at` set once the failure is permanent or
    /// the counter reaches `max_attempts`.
    ///
    /// Returns `(is_notified, permanently_failed)` after the update, or `None`
    /// when the token no longer matches.
    pub async fn release_claim(
        pool: &PgPool,
        id: DbId,
        token: ClaimToken,
        failure: Option<&AttemptFailure>,
        max_attempts: i32,
    ) -> Result<Option<(bool, bool)>, sqlx::Error> {
        let counts = failure.is_some();
        let message = failure.map(|f| f.message.as_str());
        let permanent = failure.is_some_and(|f| f.permanent);

        sqlx::query_as::<_, (bool, bool)>(
            "UPDATE quiet_hours SET \
                claim_token = NULL, claimed_at = NULL, \
                delivery_attempts = delivery_attempts + CASE WHEN $3 THEN 1 ELSE 0 END, \
                last_delivery_error = COALESCE($4, last_delivery_error), \
                delivery_failed_at = CASE \
                    WHEN $3 AND ($5 OR delivery_attempts + 1 >= $6) THEN NOW() \
                    ELSE delivery_failed_at END \
             WHERE id = $1 AND claim_token = $2 \
             RETURNING is_notified, delivery_failed_at IS NOT NULL",
        )
        .bind(id)
        .bind(token)
        .bind(counts)
        .bind(message)
        .bind(permanent)
        .bind(max_attempts)
        .fetch_optional(pool)
        .await
    }
}
