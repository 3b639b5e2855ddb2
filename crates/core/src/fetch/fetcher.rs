//! Snapshot fetching through the dedup cache

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument};
use washslot_domain::{
    AccountConfig, AccountId, AuthToken, DeadlineConfig, ResourceKey, Result, Snapshot,
    WashSlotError,
};

use super::cache::{FetchCache, FetchCacheStats};
use crate::bounded::bounded;
use crate::slot_ports::SlotSource;

/// Logs in and fetches portal state, sharing identical concurrent fetches.
pub struct SnapshotFetcher {
    source: Arc<dyn SlotSource>,
    cache: FetchCache<ResourceKey, Snapshot>,
    deadlines: DeadlineConfig,
}

impl SnapshotFetcher {
    pub fn new(source: Arc<dyn SlotSource>, deadlines: DeadlineConfig) -> Self {
        Self { source, cache: FetchCache::new(), deadlines }
    }

    pub fn source(&self) -> &Arc<dyn SlotSource> {
        &self.source
    }

    pub fn deadlines(&self) -> DeadlineConfig {
        self.deadlines
    }

    /// Log in under the login deadline.
    pub async fn login(&self, account: &AccountId) -> Result<AuthToken> {
        bounded(
            "portal.login",
            self.deadlines.login(),
            WashSlotError::Auth,
            self.source.login(account),
        )
        .await
    }

    /// Fetch the week containing `date` for the account's preferred groups.
    ///
    /// `token` is used when this call starts the fetch; without one the fetch
    /// logs in first. A caller that joins an in-flight fetch shares its
    /// outcome, errors included.
    #[instrument(skip(self, account, token), fields(account = %account.account_id, %date))]
    pub async fn fetch(
        &self,
        account: &AccountConfig,
        date: NaiveDate,
        token: Option<AuthToken>,
    ) -> Result<Snapshot> {
        let key = Self::key_for(account, date);
        let job = self.job(&key, token);
        self.cache.get_or_fetch(key, move || job).await
    }

    /// Like [`fetch`](Self::fetch), but never settles for a fetch that was
    /// started before `watermark` was taken.
    #[instrument(skip(self, account, token), fields(account = %account.account_id, %date))]
    pub async fn fetch_after(
        &self,
        account: &AccountConfig,
        date: NaiveDate,
        token: Option<AuthToken>,
        watermark: u64,
    ) -> Result<Snapshot> {
        let key = Self::key_for(account, date);
        let job = self.job(&key, token);
        self.cache.get_or_fetch_after(key, watermark, move || job).await
    }

    /// Marks "now" for [`fetch_after`](Self::fetch_after).
    pub fn watermark(&self) -> u64 {
        self.cache.watermark()
    }

    fn key_for(account: &AccountConfig, date: NaiveDate) -> ResourceKey {
        ResourceKey::new(account.account_id.clone(), date, account.preferred_groups.iter().copied())
    }

    /// Login (unless `token` is given) and scrape, each under its deadline.
    fn job(
        &self,
        key: &ResourceKey,
        token: Option<AuthToken>,
    ) -> impl Future<Output = Result<Snapshot>> + Send + 'static {
        let source = Arc::clone(&self.source);
        let deadlines = self.deadlines;
        let account_id = key.account().clone();
        let groups = key.groups().to_vec();
        let date = key.date();

        async move {
            let token = match token {
                Some(token) => token,
                None => {
                    debug!("no session supplied, logging in");
                    bounded(
                        "portal.login",
                        deadlines.login(),
                        WashSlotError::Auth,
                        source.login(&account_id),
                    )
                    .await?
                }
            };

            bounded(
                "portal.fetch_slots",
                deadlines.fetch(),
                WashSlotError::Scrape,
                source.fetch_slots(&token, &groups, date),
            )
            .await
        }
    }

    pub fn stats(&self) -> FetchCacheStats {
        self.cache.stats()
    }
}
