//! Deadlines around suspension points
//!
//! Every call that leaves the process is wrapped in [`with_deadline`], so a
//! hung collaborator turns into an ordinary [`CommonError::Timeout`] instead of
//! a stuck task.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{CommonError, CommonResult};

/// Await `fut`, failing with `CommonError::Timeout` once `limit` elapses.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use washslot_common::time::with_deadline;
///
/// # tokio_test::block_on(async {
/// let value = with_deadline("portal.login", Duration::from_secs(1), async { 5 }).await;
/// assert_eq!(value.unwrap(), 5);
/// # });
/// ```
pub async fn with_deadline<F, T>(operation: &str, limit: Duration, fut: F) -> CommonResult<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => Ok(value),
        Err(_) => {
            debug!(operation, limit_ms = limit.as_millis() as u64, "deadline elapsed");
            Err(CommonError::timeout(operation, limit))
        }
    }
}

/// Like [`with_deadline`] for fallible futures: the inner error is mapped with
/// `on_error`, an elapsed deadline with `on_timeout`.
pub async fn try_with_deadline<F, T, E, R>(
    operation: &str,
    limit: Duration,
    fut: F,
    on_timeout: impl FnOnce(CommonError) -> R,
    on_error: impl FnOnce(E) -> R,
) -> Result<T, R>
where
    F: Future<Output = Result<T, E>>,
{
    match with_deadline(operation, limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(on_error(err)),
        Err(elapsed) => Err(on_timeout(elapsed)),
    }
}
