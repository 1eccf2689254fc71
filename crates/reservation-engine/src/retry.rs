//! Bounded retries with exponential backoff.
//!
//! Waits go through a [`Sleeper`] so callers can substitute a recording or
//! zero-delay implementation for the blocking thread sleep.

use std::time::Duration;

use tracing::warn;

use crate::error::{ReservationError, Result};

/// Blocking delay on the calling thread.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps with `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

impl<F: Fn(Duration)> Sleeper for F {
    fn sleep(&self, duration: Duration) {
        self(duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Wait after failed attempt `attempt` (1-based): `initial_delay * 2^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

pub struct RetryExecutor<'s> {
    policy: RetryPolicy,
    sleeper: &'s dyn Sleeper,
}

impl<'s> RetryExecutor<'s> {
    pub fn new(policy: RetryPolicy, sleeper: &'s dyn Sleeper) -> Self {
        Self { policy, sleeper }
    }

    /// Run `operation` until it succeeds, fails with a non-transient error, or
    /// `max_retries` attempts have been made.
    ///
    /// Non-transient errors are returned unchanged after the attempt that raised
    /// them. Exhausting the attempts yields `ReservationError::RetryExhausted`
    /// carrying the last error's message.
    pub fn run<T, F>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let attempts = self.policy.max_retries.max(1);
        let mut attempt = 1;
        loop {
            let err = match operation() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => err,
            };
            if attempt >= attempts {
                return Err(ReservationError::RetryExhausted {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }
            let delay = self.policy.delay_after(attempt);
            warn!(attempt, max = attempts, delay_ms = delay.as_millis() as u64, error = %err, "attempt failed, retrying");
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }
}
