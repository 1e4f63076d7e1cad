//! Notification sweeper.
//!
//! [`NotificationSweeper`] runs as a background task. Every tick it looks for
//! active windows starting roughly one lead time from now, claims each one
//! with a compare-and-set on the store, and sends a single reminder through
//! the configured [`DeliveryAdapter`]. Nothing is remembered between ticks:
//! the claim columns on each row are the only coordination, so overlapping
//! ticks and multiple worker replicas are safe.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use quiet_core::notification::{AttemptFailure, NotificationPolicy, NotificationState};
use quiet_core::types::{ClaimToken, Timestamp};
use quiet_db::models::quiet_hour::QuietHour;
use quiet_db::store::{StoreError, WindowStore};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::contacts::ContactResolver;
use crate::delivery::{DeliveryAdapter, DeliveryError};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Counters for one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Candidates returned by the due and retry scans, de-duplicated.
    pub found: usize,
    /// Candidates this sweep managed to claim.
    pub claimed: usize,
    /// Reminders delivered.
    pub sent: usize,
    /// Deliveries that failed (including timeouts).
    pub failed: usize,
    /// Candidates left alone: claimed elsewhere, or owner unreachable.
    pub skipped: usize,
}

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    NotClaimed,
    NoContact,
    Sent,
    Failed,
}

impl SweepSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::NotClaimed => self.skipped += 1,
            Outcome::NoContact => {
                self.claimed += 1;
                self.skipped += 1;
            }
            Outcome::Sent => {
                self.claimed += 1;
                self.sent += 1;
            }
            Outcome::Failed => {
                self.claimed += 1;
                self.failed += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationSweeper
// ---------------------------------------------------------------------------

pub struct NotificationSweeper {
    store: Arc<dyn WindowStore>,
    contacts: Arc<dyn ContactResolver>,
    delivery: Arc<dyn DeliveryAdapter>,
    policy: NotificationPolicy,
}

impl NotificationSweeper {
    pub fn new(
        store: Arc<dyn WindowStore>,
        contacts: Arc<dyn ContactResolver>,
        delivery: Arc<dyn DeliveryAdapter>,
        policy: NotificationPolicy,
    ) -> Self {
        Self {
            store,
            contacts,
            delivery,
            policy,
        }
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    /// Run the sweep loop until `cancel` fires.
    ///
    /// The first sweep runs immediately. Ticks missed while a slow sweep was
    /// still running are skipped rather than replayed back to back, and a
    /// cancellation arriving mid-sweep lets that sweep finish.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.policy.sweep_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.policy.sweep_interval().as_secs(),
            lead_time_secs = self.policy.lead_time().num_seconds(),
            channel = self.delivery.channel(),
            "Notification sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification sweeper cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once(Utc::now()).await {
                        tracing::error!(error = %e, "Sweep aborted, retrying next tick");
                    }
                }
            }
        }
    }

    /// Run one sweep as of `now`.
    ///
    /// Only the candidate scans can fail the sweep, and they run before any
    /// row is touched. Per-window errors are logged and counted.
    pub async fn sweep_once(&self, now: Timestamp) -> Result<SweepSummary, StoreError> {
        let due = self.policy.due_range(now);
        let retry = self.policy.retry_range(now);

        let mut candidates = self.store.find_due_unnotified(due.from, due.to).await?;
        let stale_before = self.policy.stale_claim_cutoff(now);
        let retries = self
            .store
            .find_pending_retries(retry.from, retry.to, stale_before)
            .await?;

        let mut seen: HashSet<_> = candidates.iter().map(|w| w.id).collect();
        candidates.extend(retries.into_iter().filter(|w| seen.insert(w.id)));

        let mut summary = SweepSummary {
            found: candidates.len(),
            ..SweepSummary::default()
        };

        let outcomes: Vec<Outcome> = stream::iter(candidates)
            .map(|window| self.process(window, now))
            .buffer_unordered(self.policy.concurrency())
            .collect()
            .await;
        for outcome in outcomes {
            summary.record(outcome);
        }

        if summary.found > 0 {
            tracing::info!(
                found = summary.found,
                claimed = summary.claimed,
                sent = summary.sent,
                failed = summary.failed,
                skipped = summary.skipped,
                "Sweep finished"
            );
        } else {
            tracing::debug!(from = %due.from, to = %due.to, "Sweep found no due windows");
        }
        Ok(summary)
    }

    /// Claim, resolve, deliver, then mark or release one window.
    async fn process(&self, window: QuietHour, now: Timestamp) -> Outcome {
        let token = Uuid::new_v4();
        let stale_before = self.policy.stale_claim_cutoff(now);

        match self
            .store
            .claim_for_notification(window.id, token, now, stale_before)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(window_id = window.id, "Window claimed elsewhere, skipping");
                return Outcome::NotClaimed;
            }
            Err(e) => {
                tracing::error!(window_id = window.id, error = %e, "Failed to claim window");
                return Outcome::NotClaimed;
            }
        }

        let recipient = match self.contacts.resolve(window.user_id).await {
            Ok(recipient) => recipient,
            Err(e) => {
                tracing::warn!(
                    window_id = window.id,
                    user_id = window.user_id,
                    error = %e,
                    "Cannot reach window owner, skipping"
                );
                self.release(&window, token, None).await;
                return Outcome::NoContact;
            }
        };

        let timeout = self.policy.delivery_timeout();
        let result = tokio::time::timeout(timeout, self.delivery.deliver(&recipient, &window))
            .await
            .unwrap_or(Err(DeliveryError::Timeout(timeout)));

        match result {
            Ok(()) => {
                match self.store.mark_notified(window.id, token, now).await {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!(
                        window_id = window.id,
                        "Reminder sent but the claim was lost before marking"
                    ),
                    Err(e) => tracing::error!(
                        window_id = window.id,
                        error = %e,
                        "Reminder sent but marking it notified failed"
                    ),
                }
                Outcome::Sent
            }
            Err(e) => {
                let failure = AttemptFailure {
                    message: e.to_string(),
                    permanent: !e.is_retryable(),
                };
                let state = self.release(&window, token, Some(&failure)).await;
                tracing::warn!(
                    window_id = window.id,
                    user_id = window.user_id,
                    attempt = window.delivery_attempts + 1,
                    state = state.map(NotificationState::name),
                    error = %e,
                    "Reminder delivery failed"
                );
                Outcome::Failed
            }
        }
    }

    async fn release(
        &self,
        window: &QuietHour,
        token: ClaimToken,
        failure: Option<&AttemptFailure>,
    ) -> Option<NotificationState> {
        match self
            .store
            .release_claim(window.id, token, failure, self.policy.max_attempts())
            .await
        {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(window_id = window.id, error = %e, "Failed to release claim");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_claims_once_per_claimed_outcome() {
        let mut summary = SweepSummary::default();
        for outcome in [
            Outcome::NotClaimed,
            Outcome::NoContact,
            Outcome::Sent,
            Outcome::Sent,
            Outcome::Failed,
        ] {
            summary.record(outcome);
        }
        assert_eq!(
            summary,
            SweepSummary {
                found: 0,
                claimed: 4,
                sent: 2,
                failed: 1,
                skipped: 2,
            }
        );
    }
}
