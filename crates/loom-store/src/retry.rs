//! Shared retry/backoff policy for store operations.
//!
//! Every manager operation (connect, read, write, delete) runs under the
//! same policy: transient failures consume retry budget with exponential
//! backoff, permanent failures abort on first occurrence, and a spent
//! budget surfaces as [`Error::RetryExhausted`] so callers can tell "we
//! gave up" from "this will never succeed". Backoff sleeps race the
//! manager's shutdown signal and never run while holding a lock.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use loom_core::defaults;
use loom_core::{Error, Result};

/// Backoff parameters for retried store operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub growth_factor: f64,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
    /// Apply full jitter (uniform in [0, delay]) to each sleep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(defaults::RETRY_BASE_DELAY_MS),
            growth_factor: defaults::RETRY_GROWTH_FACTOR,
            max_delay: Duration::from_millis(defaults::RETRY_MAX_DELAY_MS),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum attempt count.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    /// Set the base delay.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the growth factor.
    pub fn growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Set the delay ceiling.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Deterministic delay after the given failed attempt (1-based):
    /// `min(base · growth^(attempt-1), max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.growth_factor.powi(attempt.saturating_sub(1) as i32);
        let raw = self.base_delay.as_millis() as f64 * exp;
        let capped = raw.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let capped = self.delay_for(attempt);
        if self.jitter {
            let millis = capped.as_millis() as u64;
            Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
        } else {
            capped
        }
    }

    /// Run `f` under this policy.
    ///
    /// Only errors with [`Error::is_transient`] consume budget; any other
    /// error surfaces immediately. A fired shutdown signal aborts the
    /// loop promptly with [`Error::Cancelled`], including mid-backoff.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        mut shutdown: watch::Receiver<bool>,
        mut f: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if *shutdown.borrow() {
                return Err(Error::Cancelled(format!("{} aborted by shutdown", label)));
            }

            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            subsystem = "store",
                            component = "retry",
                            op = label,
                            attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    warn!(
                        subsystem = "store",
                        component = "retry",
                        op = label,
                        attempt,
                        error = %e,
                        "Retry budget exhausted"
                    );
                    return Err(Error::RetryExhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        subsystem = "store",
                        component = "retry",
                        op = label,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient store failure, backing off"
                    );
                    tokio::select! {
                        _ = sleep(delay) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return Err(Error::Cancelled(format!(
                                    "{} aborted during backoff",
                                    label
                                )));
                            }
                        }
                    }
                }
            }
        }
    }
}
