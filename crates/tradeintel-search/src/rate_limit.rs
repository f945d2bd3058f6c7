//! Retry policy for outbound fetches.
//!
//! Transient failures (network errors, 5xx) are retried on an exponential
//! schedule and consume the attempt budget. HTTP 429 triggers a fixed
//! cooldown that does not consume an attempt, bounded separately so a source
//! that rate-limits forever cannot stall a search. Everything else is
//! returned on the first occurrence.

use std::future::Future;
use std::time::Duration;

use tradeintel_core::AppConfig;

use crate::error::{Disposition, FetchError};

/// Timing and budget knobs for [`retry_with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Counted attempts; at least one request is always made.
    pub max_attempts: u32,
    /// Wait after counted attempt `n` is `backoff_base * 2^(n-1)`.
    pub backoff_base: Duration,
    pub cooldown: Duration,
    pub max_cooldowns: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            cooldown: Duration::from_secs(60),
            max_cooldowns: 3,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.fetch_max_attempts.max(1),
            backoff_base: Duration::from_millis(config.fetch_backoff_base_ms),
            cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            max_cooldowns: config.max_rate_limit_cooldowns,
        }
    }

    /// Delay slept after counted attempt `attempt` (1-based) fails transiently.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

/// Runs `operation` until it succeeds or the policy says stop.
///
/// `operation` receives the 1-based counted attempt number. A 429 cooldown
/// re-runs the operation with the same number.
///
/// | Failure | Action |
/// |---------|--------|
/// | [`Disposition::Backoff`] | sleep `backoff_delay(n)`, retry as attempt `n + 1`, give up after `max_attempts` |
/// | [`Disposition::Cooldown`] | sleep `cooldown`, retry as attempt `n`, give up after `max_cooldowns` |
/// | [`Disposition::GiveUp`] | return immediately |
///
/// # Errors
///
/// Returns the last [`FetchError`] once retrying stops. A rate-limit error
/// returned here carries the number of cooldowns actually slept.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1u32;
    let mut cooldowns = 0u32;

    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match err.disposition() {
            Disposition::GiveUp => {
                tracing::debug!(
                    attempt,
                    classification = err.classification(),
                    error = %err,
                    "fetch failed permanently"
                );
                return Err(err);
            }
            Disposition::Cooldown => {
                if cooldowns >= policy.max_cooldowns {
                    tracing::warn!(
                        attempt,
                        cooldowns,
                        error = %err,
                        "rate limit persisted past cooldown budget"
                    );
                    return Err(match err {
                        FetchError::RateLimited { url, .. } => {
                            FetchError::RateLimited { url, cooldowns }
                        }
                        other => other,
                    });
                }
                cooldowns += 1;
                tracing::warn!(
                    attempt,
                    cooldown_ms = u64::try_from(policy.cooldown.as_millis()).unwrap_or(u64::MAX),
                    classification = err.classification(),
                    "rate limited; cooling down before retry"
                );
                tokio::time::sleep(policy.cooldown).await;
            }
            Disposition::Backoff => {
                if attempt >= policy.max_attempts {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        classification = err.classification(),
                        error = %err,
                        "fetch attempts exhausted"
                    );
                    return Err(err);
                }
                let delay = policy.backoff_delay(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    classification = err.classification(),
                    error = %err,
                    "transient fetch error; retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
