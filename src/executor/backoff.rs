//! Bounded exponential backoff.
//!
//! Every wait loop in the engine (process termination, safe-mode startup,
//! credential verification) goes through [`Backoff::poll`], so each loop has
//! an explicit attempt count and a computable worst-case duration.

use std::time::Duration;

use tracing::debug;

use crate::config::RecoveryConfig;
use crate::error::StackResult;

/// Exponential backoff with a hard attempt limit.
///
/// Delays: initial, 2x initial, 4x initial, ... capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max_delay,
            max_attempts,
        }
    }

    /// Backoff with the configured delays and the given attempt count.
    pub fn from_config(config: &RecoveryConfig, max_attempts: u32) -> Self {
        Self::new(
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
            max_attempts,
        )
    }

    /// Backoff that never sleeps. Tests and dry runs use it.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, max_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given zero-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(20)).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Upper bound on the time spent sleeping by [`Backoff::poll`].
    pub fn worst_case(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay(attempt))
            .sum()
    }

    /// Call `check` until it yields a value or the attempts run out.
    ///
    /// Returns `Ok(None)` when every attempt came back empty. Errors from the
    /// check abort the loop immediately.
    pub fn poll<T, F>(&self, label: &str, mut check: F) -> StackResult<Option<T>>
    where
        F: FnMut(u32) -> StackResult<Option<T>>,
    {
        debug!(
            label,
            attempts = self.max_attempts,
            worst_case_ms = self.worst_case().as_millis() as u64,
            "Polling"
        );
        for attempt in 0..self.max_attempts {
            if let Some(value) = check(attempt)? {
                debug!(label, attempt, "Condition reached");
                return Ok(Some(value));
            }
            if attempt + 1 < self.max_attempts {
                let delay = self.delay(attempt);
                debug!(label, attempt, delay_ms = delay.as_millis() as u64, "Waiting");
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }
        debug!(label, attempts = self.max_attempts, "Gave up waiting");
        Ok(None)
    }

    /// Like [`Backoff::poll`] for a boolean condition.
    pub fn wait_until<F>(&self, label: &str, mut condition: F) -> StackResult<bool>
    where
        F: FnMut() -> StackResult<bool>,
    {
        Ok(self
            .poll(label, |_| Ok(condition()?.then_some(())))?
            .is_some())
    }
}
