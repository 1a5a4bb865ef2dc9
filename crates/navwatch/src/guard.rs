//! Brute-force login guard.
//!
//! The guard is a stateless policy over the event store. Every failed attempt
//! expires `window_minutes` after it happened, so the block condition heals
//! continuously instead of resetting at fixed boundaries. Successful attempts
//! are recorded but never count toward a block and never clear earlier
//! failures.
//!
//! Origins are compared by exact equality: clients behind one shared proxy
//! address share one window.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::LoginSettings;
use crate::database::EventStore;
use crate::database::models::NewLoginAttempt;
use crate::error::StoreError;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Window length and failure threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginPolicy {
    pub window_minutes: i64,
    pub max_failures: i64,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self { window_minutes: 15, max_failures: 5 }
    }
}

impl From<&LoginSettings> for LoginPolicy {
    fn from(settings: &LoginSettings) -> Self {
        Self { window_minutes: settings.window_minutes, max_failures: settings.max_failures }
    }
}

/// `window_minutes` as a span, or an error when chrono cannot represent it.
fn window_span(window_minutes: i64) -> Result<TimeDelta, StoreError> {
    TimeDelta::try_minutes(window_minutes).ok_or(StoreError::WindowOutOfRange(window_minutes))
}

/// Derived on every call from the attempts inside the window; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDecision {
    pub blocked: bool,
    pub remaining_minutes: i64,
    pub failure_count: i64,
}

impl BlockDecision {
    /// Decision used when the window cannot be computed: blocked for a full window.
    pub fn fail_closed(policy: &LoginPolicy) -> Self {
        Self {
            blocked: true,
            remaining_minutes: policy.window_minutes,
            failure_count: policy.max_failures,
        }
    }
}

pub struct BruteForceGuard {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    policy: LoginPolicy,
}

impl BruteForceGuard {
    pub fn new(store: Arc<dyn EventStore>, policy: LoginPolicy) -> Self {
        Self::with_clock(store, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn EventStore>, policy: LoginPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, policy }
    }

    pub fn policy(&self) -> &LoginPolicy {
        &self.policy
    }

    /// Append one attempt, stamped with the guard's clock.
    pub async fn record_attempt(
        &self,
        origin: &str,
        principal: &str,
        succeeded: bool,
        agent: &str,
    ) -> Result<(), StoreError> {
        let attempt = NewLoginAttempt {
            origin,
            principal,
            succeeded,
            observed_at: self.clock.now(),
            agent,
        };
        self.store.record_login_attempt(&attempt).await?;
        debug!(origin = %origin, succeeded, "Recorded login attempt");
        Ok(())
    }

    /// Failed attempts for `origin` inside the trailing `window_minutes`.
    pub async fn failed_attempt_count(&self, origin: &str, window_minutes: i64) -> Result<i64, StoreError> {
        let since = self
            .clock
            .now()
            .checked_sub_signed(window_span(window_minutes)?)
            .ok_or(StoreError::WindowOutOfRange(window_minutes))?;
        self.store.count_failed_since(origin, since).await
    }

    pub async fn is_blocked(&self, origin: &str) -> Result<bool, StoreError> {
        let failures = self.failed_attempt_count(origin, self.policy.window_minutes).await?;
        Ok(failures >= self.policy.max_failures)
    }

    /// Whole minutes, rounded up, until the most recent failure leaves the window.
    pub async fn remaining_block_minutes(&self, origin: &str) -> Result<i64, StoreError> {
        let Some(latest) = self.store.latest_failure(origin).await? else {
            return Ok(0);
        };

        let expiry: DateTime<Utc> = latest
            .checked_add_signed(window_span(self.policy.window_minutes)?)
            .ok_or(StoreError::WindowOutOfRange(self.policy.window_minutes))?;
        let remaining_ms = (expiry - self.clock.now()).num_milliseconds();
        if remaining_ms <= 0 {
            return Ok(0);
        }
        Ok((remaining_ms + MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE)
    }

    /// Attempts left before the origin is blocked, as shown to the user.
    pub async fn remaining_attempts(&self, origin: &str) -> Result<i64, StoreError> {
        let failures = self.failed_attempt_count(origin, self.policy.window_minutes).await?;
        Ok((self.policy.max_failures - failures).max(0))
    }

    pub async fn decision(&self, origin: &str) -> Result<BlockDecision, StoreError> {
        let failure_count = self.failed_attempt_count(origin, self.policy.window_minutes).await?;
        let blocked = failure_count >= self.policy.max_failures;
        let remaining_minutes =
            if blocked { self.remaining_block_minutes(origin).await? } else { 0 };

        Ok(BlockDecision { blocked, remaining_minutes, failure_count })
    }

    /// Like [`decision`](Self::decision), but a storage failure yields a block.
    pub async fn evaluate(&self, origin: &str) -> BlockDecision {
        match self.decision(origin).await {
            Ok(decision) => {
                if decision.blocked {
                    warn!(
                        origin = %origin,
                        failures = decision.failure_count,
                        remaining_minutes = decision.remaining_minutes,
                        "Login blocked for origin"
                    );
                }
                decision
            }
            Err(e) => {
                error!(origin = %origin, error = %e, "Login window query failed, failing closed");
                BlockDecision::fail_closed(&self.policy)
            }
        }
    }
}
