//! Deadline helper for outbound requests.

use std::future::Future;
use std::time::Duration;

use crate::error::Error;

/// Run `future`, failing with [`Error::Timeout`] once `limit` has elapsed.
pub async fn with_timeout<T, F>(limit: Duration, future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
        let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(limit_ms, "deadline elapsed");
        Err(Error::Timeout(limit_ms))
    })
}
