//! In-process [`WindowStore`].
//!
//! Holds every row in a single mutex-guarded map so each trait call is
//! atomic, mirroring the single-statement guarantees of the Postgres store.
//! Used by the API and sweeper test suites and for running the server
//! without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use quiet_core::interval::{ranges_overlap, ScanRange};
use quiet_core::notification::{AttemptFailure, NotificationState};
use quiet_core::quiet_hour::ValidQuietHour;
use quiet_core::types::{ClaimToken, DbId, Timestamp};

use super::{StoreError, WindowStore};
use crate::models::quiet_hour::QuietHour;

#[derive(Default)]
struct Rows {
    by_id: BTreeMap<DbId, QuietHour>,
    last_id: DbId,
}

#[derive(Default)]
pub struct MemoryWindowStore {
    rows: Mutex<Rows>,
    unavailable: AtomicBool,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    /// until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// A row by id regardless of owner or active flag.
    pub fn snapshot(&self, id: DbId) -> Option<QuietHour> {
        self.rows
            .lock()
            .ok()
            .and_then(|rows| rows.by_id.get(&id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rows>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

fn is_sweepable(row: &QuietHour) -> bool {
    row.is_active && !row.is_notified && row.delivery_failed_at.is_none()
}

fn holds_stale_claim(row: &QuietHour, stale_before: Timestamp) -> bool {
    row.claim_token.is_some() && row.claimed_at.is_some_and(|at| at < stale_before)
}

fn sorted_by_start(mut rows: Vec<QuietHour>) -> Vec<QuietHour> {
    rows.sort_by_key(|r| (r.start_time, r.id));
    rows
}

fn overlapping<'a>(
    rows: &'a Rows,
    user_id: DbId,
    start: Timestamp,
    end: Timestamp,
    exclude_id: Option<DbId>,
) -> impl Iterator<Item = &'a QuietHour> {
    rows.by_id.values().filter(move |r| {
        r.user_id == user_id
            && r.is_active
            && Some(r.id) != exclude_id
            && ranges_overlap(r.start_time, r.end_time, start, end)
    })
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn find_active_overlapping(
        &self,
        user_id: DbId,
        start: Timestamp,
        end: Timestamp,
        exclude_id: Option<DbId>,
    ) -> Result<Vec<QuietHour>, StoreError> {
        let rows = self.lock()?;
        let found = overlapping(&rows, user_id, start, end, exclude_id)
            .cloned()
            .collect();
        Ok(sorted_by_start(found))
    }

    async fn find_due_unnotified(
        &self,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<QuietHour>, StoreError> {
        let due = ScanRange {
            from: window_start,
            to: window_end,
        };
        let rows = self.lock()?;
        let found = rows
            .by_id
            .values()
            .filter(|r| is_sweepable(r) && due.contains(r.start_time))
            .cloned()
            .collect();
        Ok(sorted_by_start(found))
    }

    async fn find_pending_retries(
        &self,
        after: Timestamp,
        until: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Vec<QuietHour>, StoreError> {
        let rows = self.lock()?;
        let found = rows
            .by_id
            .values()
            .filter(|r| {
                is_sweepable(r)
                    && (r.delivery_attempts > 0 || holds_stale_claim(r, stale_before))
                    && r.start_time > after
                    && r.start_time <= until
            })
            .cloned()
            .collect();
        Ok(sorted_by_start(found))
    }

    async fn claim_for_notification(
        &self,
        id: DbId,
        token: ClaimToken,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut rows = self.lock()?;
        let Some(row) = rows.by_id.get_mut(&id) else {
            return Ok(false);
        };
        let free = row.claim_token.is_none() || holds_stale_claim(row, stale_before);
        if !is_sweepable(row) || !free {
            return Ok(false);
        }
        row.claim_token = Some(token);
        row.claimed_at = Some(now);
        Ok(true)
    }

    async fn mark_notified(
        &self,
        id: DbId,
        token: ClaimToken,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut rows = self.lock()?;
        match rows.by_id.get_mut(&id) {
            Some(row) if row.claim_token == Some(token) && !row.is_notified => {
                row.is_notified = true;
                row.notified_at = Some(at);
                row.claim_token = None;
                row.claimed_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claim(
        &self,
        id: DbId,
        token: ClaimToken,
        failure: Option<&AttemptFailure>,
        max_attempts: i32,
    ) -> Result<Option<NotificationState>, StoreError> {
        let mut rows = self.lock()?;
        let Some(row) = rows.by_id.get_mut(&id) else {
            return Ok(None);
        };
        if row.claim_token != Some(token) {
            return Ok(None);
        }

        row.claim_token = None;
        row.claimed_at = None;
        if let Some(failure) = failure {
            row.delivery_attempts += 1;
            row.last_delivery_error = Some(failure.message.clone());
            let next = NotificationState::after_failure(
                row.delivery_attempts,
                max_attempts,
                failure.permanent,
            );
            if next == NotificationState::FailedPermanent {
                row.delivery_failed_at = Some(Utc::now());
            }
        }
        Ok(Some(row.notification_state()))
    }

    async fn upsert(
        &self,
        user_id: DbId,
        id: Option<DbId>,
        fields: &ValidQuietHour,
    ) -> Result<Option<QuietHour>, StoreError> {
        let mut rows = self.lock()?;

        if let Some(id) = id {
            let owned = rows
                .by_id
                .get(&id)
                .is_some_and(|r| r.user_id == user_id && r.is_active);
            if !owned {
                return Ok(None);
            }
        }
        if overlapping(&rows, user_id, fields.start_time, fields.end_time, id)
            .next()
            .is_some()
        {
            return Err(StoreError::Overlap);
        }

        let now = Utc::now();
        let row = match id {
            Some(id) => {
                let Some(row) = rows.by_id.get_mut(&id) else {
                    return Ok(None);
                };
                row.title = fields.title.clone();
                row.description = fields.description.clone();
                row.start_time = fields.start_time;
                row.end_time = fields.end_time;
                row.updated_at = now;
                row.clone()
            }
            None => {
                rows.last_id += 1;
                let row = QuietHour {
                    id: rows.last_id,
                    user_id,
                    title: fields.title.clone(),
                    description: fields.description.clone(),
                    start_time: fields.start_time,
                    end_time: fields.end_time,
                    is_active: true,
                    is_notified: false,
                    notified_at: None,
                    claim_token: None,
                    claimed_at: None,
                    delivery_attempts: 0,
                    last_delivery_error: None,
                    delivery_failed_at: None,
                    created_at: now,
                    updated_at: now,
                };
                rows.by_id.insert(row.id, row.clone());
                row
            }
        };
        Ok(Some(row))
    }

    async fn soft_delete(&self, user_id: DbId, id: DbId) -> Result<bool, StoreError> {
        let mut rows = self.lock()?;
        match rows.by_id.get_mut(&id) {
            Some(row) if row.user_id == user_id && row.is_active => {
                row.is_active = false;
                row.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_id(&self, user_id: DbId, id: DbId) -> Result<Option<QuietHour>, StoreError> {
        let rows = self.lock()?;
        Ok(rows
            .by_id
            .get(&id)
            .filter(|r| r.user_id == user_id && r.is_active)
            .cloned())
    }

    async fn list_active(&self, user_id: DbId) -> Result<Vec<QuietHour>, StoreError> {
        let rows = self.lock()?;
        let found = rows
            .by_id
            .values()
            .filter(|r| r.user_id == user_id && r.is_active)
            .cloned()
            .collect();
        Ok(sorted_by_start(found))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
