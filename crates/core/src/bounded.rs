//! Deadline wrapper for port calls
//!
//! Port calls already fail with the right [`WashSlotError`] kind. An elapsed
//! deadline is folded into that same kind so callers handle one failure shape.

use std::future::Future;
use std::time::Duration;

use washslot_common::time::try_with_deadline;
use washslot_domain::{Result, WashSlotError};

/// Await a port call under `limit`; a timeout becomes `kind("... timed out ...")`.
pub(crate) async fn bounded<T, F>(
    operation: &str,
    limit: Duration,
    kind: fn(String) -> WashSlotError,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    try_with_deadline(operation, limit, fut, |elapsed| kind(elapsed.to_string()), |err| err).await
}
