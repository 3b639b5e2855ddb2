//! Calendar service port interfaces
//!
//! Rate limiting and the wire protocol belong to the adapter. Every method is
//! called under a deadline by the reconciler.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use washslot_domain::{AccountId, DesiredEvent, RemoteEvent, Result};

/// Trait for calendar sink operations
#[async_trait]
pub trait CalendarSink: Send + Sync {
    /// List events whose start lies in `[start, end)` in the account's
    /// calendar.
    ///
    /// Fails with `WashSlotError::CalendarFetch`.
    async fn fetch_events(
        &self,
        account: &AccountId,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<RemoteEvent>>;

    /// Insert an event. Fails with `WashSlotError::CalendarWrite`.
    async fn push_event(&self, account: &AccountId, event: &DesiredEvent) -> Result<()>;

    /// Delete an event by remote id. Fails with `WashSlotError::CalendarWrite`.
    async fn remove_event(&self, account: &AccountId, event_id: &str) -> Result<()>;
}
