//! Booking portal port interfaces
//!
//! The portal is scraped HTML behind a session login. Adapters translate its
//! pages into [`Snapshot`]s and its forms into book/unbook actions.

use async_trait::async_trait;
use chrono::NaiveDate;
use washslot_domain::{AccountId, AuthToken, BookingRequest, Group, GroupId, Result, Snapshot};

/// Read side of the booking portal.
#[async_trait]
pub trait SlotSource: Send + Sync {
    /// Log in to the portal for an account.
    ///
    /// Fails with `WashSlotError::Auth`.
    async fn login(&self, account: &AccountId) -> Result<AuthToken>;

    /// Fetch slot state for the week containing `date`, restricted to `groups`.
    ///
    /// Fails with `WashSlotError::Scrape`.
    async fn fetch_slots(
        &self,
        token: &AuthToken,
        groups: &[GroupId],
        date: NaiveDate,
    ) -> Result<Snapshot>;

    /// List the machine groups the account may book.
    async fn list_groups(&self, token: &AuthToken) -> Result<Vec<Group>>;
}

/// Write side of the booking portal.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Book or unbook a single group in a single time range.
    ///
    /// Fails with `WashSlotError::Action`.
    async fn apply_action(&self, token: &AuthToken, request: &BookingRequest) -> Result<()>;
}
