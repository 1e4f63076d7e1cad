//! Reminder policy and the per-window notification state machine.
//!
//! The sweeper never keeps state in memory between ticks. Everything it
//! needs to decide what to do with a window is derived from persisted
//! columns (`is_notified`, `claim_token`, `delivery_failed_at`) through
//! [`NotificationState`], and every time computation goes through
//! [`NotificationPolicy`].

use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;
use crate::interval::ScanRange;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// How long before `start_time` a reminder should fire.
pub const DEFAULT_LEAD_TIME_SECS: i64 = 600;

/// Drift allowed on either side of the lead time.
pub const DEFAULT_TOLERANCE_SECS: i64 = 30;

/// Sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Upper bound on a single delivery call.
pub const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 30;

/// Failed deliveries allowed before a window becomes permanently failed.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Age after which an unreleased claim is considered abandoned.
pub const DEFAULT_CLAIM_TTL_SECS: i64 = 300;

/// Windows processed in parallel within one sweep.
pub const DEFAULT_SWEEP_CONCURRENCY: usize = 4;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Raw, unvalidated policy values (seconds), typically read from the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    pub lead_time_secs: i64,
    pub tolerance_secs: i64,
    pub sweep_interval_secs: u64,
    pub delivery_timeout_secs: u64,
    pub max_attempts: i32,
    pub claim_ttl_secs: i64,
    pub concurrency: usize,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            lead_time_secs: DEFAULT_LEAD_TIME_SECS,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            delivery_timeout_secs: DEFAULT_DELIVERY_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            claim_ttl_secs: DEFAULT_CLAIM_TTL_SECS,
            concurrency: DEFAULT_SWEEP_CONCURRENCY,
        }
    }
}

/// Validated reminder policy shared by every sweep.
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    lead_time: chrono::Duration,
    tolerance: chrono::Duration,
    sweep_interval: Duration,
    delivery_timeout: Duration,
    max_attempts: i32,
    claim_ttl: chrono::Duration,
    concurrency: usize,
}

impl NotificationPolicy {
    /// Validate settings into a policy.
    ///
    /// The tolerance must cover at least half the sweep cadence, otherwise a
    /// window could start its lead period between two ticks and be missed.
    /// The claim TTL must outlive the delivery timeout so a live claim is
    /// never mistaken for an abandoned one.
    pub fn new(settings: PolicySettings) -> Result<Self, CoreError> {
        let PolicySettings {
            lead_time_secs,
            tolerance_secs,
            sweep_interval_secs,
            delivery_timeout_secs,
            max_attempts,
            claim_ttl_secs,
            concurrency,
        } = settings;

        if lead_time_secs <= 0 {
            return Err(invalid("lead time must be positive"));
        }
        if tolerance_secs < 0 {
            return Err(invalid("tolerance must not be negative"));
        }
        if sweep_interval_secs == 0 {
            return Err(invalid("sweep interval must be positive"));
        }
        if (tolerance_secs as u64) * 2 < sweep_interval_secs {
            return Err(invalid(&format!(
                "tolerance ({tolerance_secs}s) must be at least half the sweep interval ({sweep_interval_secs}s)"
            )));
        }
        if delivery_timeout_secs == 0 {
            return Err(invalid("delivery timeout must be positive"));
        }
        if claim_ttl_secs <= delivery_timeout_secs as i64 {
            return Err(invalid(&format!(
                "claim TTL ({claim_ttl_secs}s) must exceed the delivery timeout ({delivery_timeout_secs}s)"
            )));
        }
        if max_attempts < 1 {
            return Err(invalid("max attempts must be at least 1"));
        }
        if concurrency == 0 {
            return Err(invalid("sweep concurrency must be at least 1"));
        }

        Ok(Self {
            lead_time: chrono::Duration::seconds(lead_time_secs),
            tolerance: chrono::Duration::seconds(tolerance_secs),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            delivery_timeout: Duration::from_secs(delivery_timeout_secs),
            max_attempts,
            claim_ttl: chrono::Duration::seconds(claim_ttl_secs),
            concurrency,
        })
    }

    /// Start times due for a first reminder at `now`:
    /// `[now + lead - tolerance, now + lead + tolerance]`.
    pub fn due_range(&self, now: Timestamp) -> ScanRange {
        let target = now + self.lead_time;
        ScanRange {
            from: target - self.tolerance,
            to: target + self.tolerance,
        }
    }

    /// Start times eligible for a retry at `now`. `from` is exclusive: a
    /// window that has already started is no longer worth a reminder.
    pub fn retry_range(&self, now: Timestamp) -> ScanRange {
        ScanRange {
            from: now,
            to: now + self.lead_time + self.tolerance,
        }
    }

    /// Claims taken before this instant are treated as abandoned.
    pub fn stale_claim_cutoff(&self, now: Timestamp) -> Timestamp {
        now - self.claim_ttl
    }

    pub fn lead_time(&self) -> chrono::Duration {
        self.lead_time
    }

    pub fn tolerance(&self) -> chrono::Duration {
        self.tolerance
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            lead_time: chrono::Duration::seconds(DEFAULT_LEAD_TIME_SECS),
            tolerance: chrono::Duration::seconds(DEFAULT_TOLERANCE_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            claim_ttl: chrono::Duration::seconds(DEFAULT_CLAIM_TTL_SECS),
            concurrency: DEFAULT_SWEEP_CONCURRENCY,
        }
    }
}

fn invalid(msg: &str) -> CoreError {
    CoreError::Validation(format!("Invalid notification policy: {msg}"))
}

// ---------------------------------------------------------------------------
// Failed attempts
// ---------------------------------------------------------------------------

/// A failed delivery as recorded against a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub message: String,
    /// The failure will not go away by retrying (e.g. rejected address).
    pub permanent: bool,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Where a window stands with respect to its single reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    /// Not yet sent, nobody working on it.
    Pending,
    /// A sweep holds the claim and is delivering.
    Claimed,
    /// Reminder delivered. Terminal.
    Notified,
    /// Retry budget spent or a non-retryable failure. Terminal for
    /// automatic sends; `is_notified` stays false for auditing.
    FailedPermanent,
}

impl NotificationState {
    /// Derive the state from persisted columns.
    pub fn from_flags(is_notified: bool, is_claimed: bool, failed_permanently: bool) -> Self {
        if is_notified {
            Self::Notified
        } else if failed_permanently {
            Self::FailedPermanent
        } else if is_claimed {
            Self::Claimed
        } else {
            Self::Pending
        }
    }

    /// State a claimed window moves to after a failed delivery.
    ///
    /// `attempts` already includes the attempt that just failed.
    pub fn after_failure(attempts: i32, max_attempts: i32, permanent: bool) -> Self {
        if permanent || attempts >= max_attempts {
            Self::FailedPermanent
        } else {
            Self::Pending
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Notified => "notified",
            Self::FailedPermanent => "failed_permanent",
        }
    }
}
