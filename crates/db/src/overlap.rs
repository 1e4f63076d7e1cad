//! Overlap validation for a user's active quiet hours.
//!
//! Two windows `[s1, e1)` and `[s2, e2)` clash iff `s1 < e2 && s2 < e1`, so
//! back-to-back windows (`e1 == s2`) are accepted. The store query applies
//! the same predicate; this module only turns a hit into a conflict.

use quiet_core::error::CoreError;
use quiet_core::types::{DbId, Timestamp};

use crate::models::quiet_hour::QuietHour;
use crate::service::WindowError;
use crate::store::WindowStore;

pub const CONFLICT_MESSAGE: &str = "You already have a quiet hour scheduled during this time";

/// Build the conflict error, naming the clashing window when known.
pub fn conflict_error(existing: Option<&QuietHour>) -> CoreError {
    match existing {
        Some(w) => CoreError::Conflict(format!(
            "{CONFLICT_MESSAGE} (overlaps #{} '{}')",
            w.id, w.title
        )),
        None => CoreError::Conflict(CONFLICT_MESSAGE.to_string()),
    }
}

/// Check `[start, end)` against every other active window of `user_id`.
///
/// Read-only. A store failure is returned as-is and the caller must not go
/// on to commit the write.
pub async fn validate(
    store: &dyn WindowStore,
    user_id: DbId,
    start: Timestamp,
    end: Timestamp,
    exclude_id: Option<DbId>,
) -> Result<(), WindowError> {
    let clashes = store
        .find_active_overlapping(user_id, start, end, exclude_id)
        .await?;

    match clashes.first() {
        None => Ok(()),
        Some(existing) => {
            tracing::debug!(
                user_id,
                conflicting_id = existing.id,
                "Quiet hour overlaps an existing window"
            );
            Err(conflict_error(Some(existing)).into())
        }
    }
}
