//! Retry with exponential backoff and jitter for idempotent HTTP calls.

use std::future::Future;
use std::time::Duration;

use crate::auth::AuthError;
use crate::error::Error;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if attempt >= max_attempts || !err.is_retryable() {
                return Err(err);
            }

            let delay = server_delay(&err).unwrap_or_else(|| jittered(backoff));
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "request failed, retrying"
            );
            tokio::time::sleep(delay).await;

            backoff = Duration::from_secs_f64(
                (backoff.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64()),
            );
            attempt += 1;
        }
    }
}

/// Honour a server-provided `Retry-After` when the error carries one.
fn server_delay(err: &Error) -> Option<Duration> {
    match err {
        Error::Auth(AuthError::RateLimited {
            retry_after_ms: Some(ms),
        })
        | Error::Api {
            retry_after_ms: Some(ms),
            ..
        } => Some(Duration::from_millis(*ms)),
        _ => None,
    }
}

/// `Retry-After` in (possibly fractional) seconds, as Discord and most
/// backends send it.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let secs = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| (secs * 1000.0) as u64)
}

/// 75%-125% of `backoff`.
fn jittered(backoff: Duration) -> Duration {
    let sample = u16::from_le_bytes([
        uuid::Uuid::new_v4().as_bytes()[0],
        uuid::Uuid::new_v4().as_bytes()[1],
    ]);
    let factor = 0.75 + (f64::from(sample) / f64::from(u16::MAX)) * 0.5;
    Duration::from_secs_f64(backoff.as_secs_f64() * factor)
}
