//! Caller-driven retry of whole logical transactions
//!
//! Mediation itself never retries: a `StaleVersion` aborts the mediation and
//! is returned to the caller. `Engine::run_with_retry` is the explicit opt-in
//! for callers that want to re-run their logical transaction from scratch.

use concord_core::ConcordError;
use std::time::Duration;

/// How often, and how patiently, a logical transaction is re-run after it
/// lost a version race on a root
///
/// Only conflicts are retried. A phase failure or a veto reaches the caller
/// on the first attempt.
///
/// # Example
/// ```ignore
/// // Two keepers feeding the same Pen: the loser re-reads and tries again
/// let policy = RetryConfig::new().with_max_retries(5).with_max_delay_ms(200);
/// engine.run_with_retry(policy, |session| session.save(&mut dingo.clone()))?;
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Re-runs allowed after the first attempt
    pub max_retries: usize,
    /// Pause before the first re-run; doubles on each further one
    pub base_delay_ms: u64,
    /// Ceiling for the pause
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on the first conflict
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Whether the transaction that failed on `attempt` (zero-based) with
    /// `error` gets another run
    pub(crate) fn should_retry(&self, error: &ConcordError, attempt: usize) -> bool {
        error.is_conflict() && attempt < self.max_retries
    }

    /// Pause after the failed `attempt`
    pub(crate) fn backoff(&self, attempt: usize) -> Duration {
        let factor = 2u64.saturating_pow(attempt.min(64) as u32);
        let doubled = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(doubled.min(self.max_delay_ms))
    }
}
