//! Shared utility functions.

use std::future::Future;
use std::time::Duration;

use tokio::task::spawn_blocking;
use tokio::time::timeout;

use crate::{Error, Result};

/// Run blocking work (file I/O) on the blocking pool.
pub async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))?
}

/// Await `fut`, bounded by `duration` when one is given.
pub async fn maybe_timeout<F, T>(duration: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    match duration {
        Some(d) => timeout(d, fut).await.map_err(|_| Error::Timeout(d)),
        None => Ok(fut.await),
    }
}

/// Exponential backoff delay for the given zero-based attempt.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
