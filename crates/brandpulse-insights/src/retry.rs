//! Retry with exponential back-off and jitter for the outbound HTTP clients.
//!
//! Rate-limit responses wait at least as long as the server asked for.

use std::future::Future;
use std::time::Duration;

use crate::error::InsightsError;

/// Transport settings shared by every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base_secs: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms: backoff_base_secs.saturating_mul(1_000),
        }
    }

    /// No retries. Used by tests that assert a single request.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: rate limiting, timeouts, connection failures, HTTP 5xx.
/// Everything else (bad credentials, malformed bodies, 4xx) is returned at once.
pub(crate) fn is_retriable(err: &InsightsError) -> bool {
    match err {
        InsightsError::RateLimited { .. } => true,
        InsightsError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        InsightsError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// transient errors.
///
/// Attempt `n` sleeps `backoff_base_ms * 2^(n-1)` with ±25% jitter, capped at
/// 60 s. A [`InsightsError::RateLimited`] error sleeps at least its
/// `retry_after_secs`.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, InsightsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InsightsError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = policy
                    .backoff_base_ms
                    .saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let floor_ms = match &err {
                    InsightsError::RateLimited {
                        retry_after_secs, ..
                    } => retry_after_secs.saturating_mul(1_000),
                    _ => 0,
                };
                let delay_ms = jittered.max(floor_ms);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
