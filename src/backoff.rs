//! Shared retry/backoff policy
//!
//! All network callers (pre-filter, providers, market data client) retry
//! through the same policy instead of carrying their own sleep loops.
//! Rate limits get the full attempt budget with an exponential curve;
//! auth failures get exactly one retry; everything else is not retried.

use std::future::Future;
use std::time::Duration;

use crate::error::ScanError;

/// Retry policy with an exponential backoff curve
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Maximum attempts for retryable errors (including the first)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each attempt
    pub multiplier: f64,
    /// Ceiling on any single delay
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Attempt budget for a given error kind
    ///
    /// Auth failures are retried once; rate limits and transient transport
    /// errors get the full budget; everything else fails immediately.
    pub fn budget_for(&self, err: &ScanError) -> u32 {
        match err {
            ScanError::Auth => 2,
            e if e.is_retryable() => self.max_attempts,
            _ => 1,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_delay)
    }

    /// Run `op` until it succeeds or its retry budget is exhausted
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T, ScanError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScanError>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let budget = self.budget_for(&err);
                    if attempt >= budget {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt,
                        budget,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
