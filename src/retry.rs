//! Retry with exponential backoff for external generation calls.
//!
//! A single reusable wrapper applied uniformly to every external call.
//! Only transient failures (timeouts, rate limits, 5xx-equivalents) are
//! retried; exhausting attempts surfaces the last typed failure to the
//! caller, never a default value.

use crate::config::RetrySettings;
use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy: attempt count and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts (first try included).
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Multiplicative backoff factor.
    pub factor: f64,
    /// Cap on the computed delay.
    pub max_delay: Duration,
    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            factor: settings.backoff_factor,
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}

impl RetryPolicy {
    /// Compute the delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.as_secs_f64() * self.factor.powi(attempt as i32);
        let capped = backoff.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter {
            rand::thread_rng().gen_range(0.0..=capped * 0.1)
        } else {
            0.0
        };
        Duration::from_secs_f64(capped + jitter)
    }
}

/// Run `op`, retrying transient failures with exponential backoff.
///
/// `what` names the operation for log output. Non-transient errors and
/// exhausted attempts propagate unchanged.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {} of {} failed for {}: {}. Retrying in {:.2}s...",
                    attempt + 1,
                    policy.max_attempts,
                    what,
                    e,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
