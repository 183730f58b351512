// Bounded retry with capped exponential backoff, applied explicitly at the
// call site around any fallible async operation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Every attempt failed, or the last failure was not retryable.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct FetchError {
    pub attempts: u32,
    pub last_error: anyhow::Error,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Length of one backoff unit (one second in production).
    pub time_unit: Duration,
    /// Backoff floor, in units.
    pub min_backoff_units: u32,
    /// Backoff ceiling, in units.
    pub max_backoff_units: u32,
    /// Which failures are worth another attempt.
    pub retryable: fn(&anyhow::Error) -> bool,
}

impl Default for RetryPolicy {
    /// Three attempts, waiting 2 then 4 units between them; any failure retries.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            time_unit: Duration::from_secs(1),
            min_backoff_units: 2,
            max_backoff_units: 10,
            retryable: |_| true,
        }
    }
}

impl RetryPolicy {
    pub fn with_time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn with_retryable(mut self, retryable: fn(&anyhow::Error) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Wait before retry `k` (k >= 1): `clamp(2^k, floor, ceiling)` units.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let units = exp.clamp(self.min_backoff_units, self.max_backoff_units.max(self.min_backoff_units));
        self.time_unit * units
    }

    /// Run `op` until it succeeds, attempts run out, or it fails with a
    /// non-retryable error. `label` only identifies the operation in logs.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= max_attempts || !(self.retryable)(&e) {
                        return Err(FetchError {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    let backoff = self.backoff(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
