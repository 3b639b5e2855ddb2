//! Slot sync service
//!
//! Owns every stateful component and the dispatcher task. Snapshots from the
//! booking pipeline, scheduled refreshes and [`SlotSyncService::inject`] all
//! travel over one channel to the dispatcher, which runs them through the
//! ordering gate and reconciles accepted ones one at a time, in arrival order.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate};
use chrono_tz::Tz;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use washslot_common::Clock;
use washslot_domain::constants::DAYS_PER_WEEK;
use washslot_domain::{
    AccountConfig, AccountId, AuditEvent, AuditKind, BookingRequest, Config, Group,
    ReconciliationResult, Result, Snapshot, StampedSnapshot, WashSlotError,
};

use crate::audit_ports::AuditSink;
use crate::booking::pipeline::now_utc;
use crate::booking::{BookingPipeline, BookingTicket};
use crate::bounded::bounded;
use crate::calendar_ports::CalendarSink;
use crate::fetch::{FetchCacheStats, SnapshotFetcher};
use crate::ordering::OrderingGate;
use crate::reconcile::CalendarReconciler;
use crate::slot_ports::{ActionExecutor, SlotSource};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// External collaborators the service talks to.
#[derive(Clone)]
pub struct SyncPorts {
    pub source: Arc<dyn SlotSource>,
    pub executor: Arc<dyn ActionExecutor>,
    pub calendar: Arc<dyn CalendarSink>,
    pub audit: Arc<dyn AuditSink>,
}

/// A snapshot that passed the gate and what reconciling it did.
#[derive(Debug, Clone)]
pub struct AcceptedUpdate {
    pub stamped: StampedSnapshot,
    pub result: ReconciliationResult,
}

/// Per-account outcome of [`SlotSyncService::refresh_all`].
#[derive(Debug, Default)]
pub struct RefreshSummary {
    /// Accounts with at least one week injected, with the number of weeks.
    pub refreshed: Vec<(AccountId, usize)>,
    pub failed: Vec<(AccountId, WashSlotError)>,
}

impl RefreshSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Entry point for bookings, refreshes and queries.
pub struct SlotSyncService {
    config: Arc<Config>,
    tz: Tz,
    fetcher: Arc<SnapshotFetcher>,
    pipeline: BookingPipeline,
    gate: Arc<OrderingGate>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    feed: mpsc::UnboundedSender<StampedSnapshot>,
    updates: broadcast::Sender<AcceptedUpdate>,
    cancel: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl SlotSyncService {
    /// Validate `config`, build the components and spawn the dispatcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: Arc<Config>, ports: SyncPorts, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let tz = config.calendar.tz()?;

        let fetcher = Arc::new(SnapshotFetcher::new(Arc::clone(&ports.source), config.deadlines));
        let gate = Arc::new(OrderingGate::new(config.ordering.scope));
        let reconciler = CalendarReconciler::new(
            Arc::clone(&ports.calendar),
            config.calendar.clone(),
            config.deadlines,
        )?;

        let (feed, rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let pipeline = BookingPipeline::new(
            Arc::clone(&config),
            Arc::clone(&fetcher),
            ports.executor,
            Arc::clone(&ports.audit),
            Arc::clone(&clock),
            Some(feed.clone()),
        );

        let dispatcher = Dispatcher {
            config: Arc::clone(&config),
            gate: Arc::clone(&gate),
            reconciler,
            updates: updates.clone(),
        };
        let handle = tokio::spawn(dispatcher.run(rx, cancel.clone()));

        info!(accounts = config.accounts.len(), scope = ?config.ordering.scope, "slot sync service started");

        Ok(Self {
            config,
            tz,
            fetcher,
            pipeline,
            gate,
            audit: ports.audit,
            clock,
            feed,
            updates,
            cancel,
            dispatcher: Mutex::new(Some(handle)),
        })
    }

    /// Submit a booking request to the pipeline.
    pub fn submit(&self, request: BookingRequest) -> Result<BookingTicket> {
        self.pipeline.submit(request)
    }

    /// Hand a ready snapshot to the dispatcher.
    pub fn inject(&self, stamped: StampedSnapshot) -> Result<()> {
        self.feed
            .send(stamped)
            .map_err(|_| WashSlotError::Internal("dispatcher is not running".into()))
    }

    /// Refresh one account's lookahead weeks.
    ///
    /// Logs in once, then fetches `today + 7*i` for each lookahead week. Each
    /// week is stamped when its fetch completes and injected on its own, so a
    /// failing week does not hold back the others. Returns the number of weeks
    /// injected, or the last error when none were.
    #[instrument(skip(self), fields(%account))]
    pub async fn refresh_account(&self, account: &AccountId) -> Result<usize> {
        let account = self.account(account)?;
        if account.lookahead_weeks == 0 {
            return Ok(0);
        }

        let token = self.fetcher.login(&account.account_id).await?;
        let today = self.today();

        let mut injected = 0;
        let mut last_error = None;
        for week in 0..i64::from(account.lookahead_weeks) {
            let date = today + ChronoDuration::days(DAYS_PER_WEEK * week);
            match self.fetcher.fetch(account, date, Some(token.clone())).await {
                Ok(snapshot) => {
                    let stamped = StampedSnapshot::new(
                        account.account_id.clone(),
                        snapshot,
                        now_utc(self.clock.as_ref()),
                    );
                    self.inject(stamped)?;
                    injected += 1;
                }
                Err(err) => {
                    warn!(%date, error = %err, "lookahead week fetch failed");
                    last_error = Some(err);
                }
            }
        }

        match (injected, last_error) {
            (0, Some(err)) => Err(err),
            _ => {
                debug!(weeks = injected, "account refreshed");
                Ok(injected)
            }
        }
    }

    /// Refresh every configured account concurrently.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let runs = self.config.accounts.iter().map(|account| async move {
            (account.account_id.clone(), self.refresh_account(&account.account_id).await)
        });

        let mut summary = RefreshSummary::default();
        for (account, outcome) in join_all(runs).await {
            match outcome {
                Ok(weeks) => summary.refreshed.push((account, weeks)),
                Err(err) => {
                    error!(%account, error = %err, "account refresh failed");
                    summary.failed.push((account, err));
                }
            }
        }

        info!(
            refreshed = summary.refreshed.len(),
            failed = summary.failed.len(),
            "scheduled refresh finished"
        );
        summary
    }

    /// Current portal state for the week containing `day`. Nothing is written
    /// to the calendar.
    #[instrument(skip(self), fields(%account, %day))]
    pub async fn status(&self, account: &AccountId, day: NaiveDate) -> Result<Snapshot> {
        let account = self.account(account)?;
        let snapshot = self.fetcher.fetch(account, day, None).await?;
        self.record(account, AuditKind::CheckedStatus { day }).await;
        Ok(snapshot)
    }

    /// Machine groups the account may book.
    #[instrument(skip(self), fields(%account))]
    pub async fn groups(&self, account: &AccountId) -> Result<Vec<Group>> {
        let account = self.account(account)?;
        let token = self.fetcher.login(&account.account_id).await?;
        let groups = bounded(
            "portal.list_groups",
            self.config.deadlines.fetch(),
            WashSlotError::Scrape,
            self.fetcher.source().list_groups(&token),
        )
        .await?;

        self.record(account, AuditKind::ListedGroups { count: groups.len() }).await;
        Ok(groups)
    }

    /// Stream of accepted snapshots and their reconciliation results.
    pub fn subscribe(&self) -> broadcast::Receiver<AcceptedUpdate> {
        self.updates.subscribe()
    }

    pub fn gate(&self) -> &OrderingGate {
        &self.gate
    }

    pub fn pipeline(&self) -> &BookingPipeline {
        &self.pipeline
    }

    pub fn fetch_stats(&self) -> FetchCacheStats {
        self.fetcher.stats()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the dispatcher after the update it is working on, if any.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.dispatcher.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "dispatcher task failed");
            }
        }
        info!("slot sync service stopped");
    }

    fn account(&self, id: &AccountId) -> Result<&AccountConfig> {
        self.config
            .account(id)
            .ok_or_else(|| WashSlotError::NotFound(format!("account '{id}'")))
    }

    fn today(&self) -> NaiveDate {
        now_utc(self.clock.as_ref()).with_timezone(&self.tz).date_naive()
    }

    async fn record(&self, account: &AccountConfig, kind: AuditKind) {
        let event = AuditEvent::new(account.account_id.clone(), now_utc(self.clock.as_ref()), kind);
        if let Err(err) = self.audit.record(event).await {
            warn!(error = %err, "audit record failed");
        }
    }
}

impl Drop for SlotSyncService {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
        }
    }
}

struct Dispatcher {
    config: Arc<Config>,
    gate: Arc<OrderingGate>,
    reconciler: CalendarReconciler,
    updates: broadcast::Sender<AcceptedUpdate>,
}

impl Dispatcher {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<StampedSnapshot>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(stamped) => self.handle(stamped).await,
                    None => break,
                },
            }
        }
        debug!("dispatcher exited");
    }

    async fn handle(&self, stamped: StampedSnapshot) {
        let Some(account) = self.config.account(&stamped.account) else {
            warn!(account = %stamped.account, "snapshot for unknown account dropped");
            return;
        };

        let decision = self.gate.try_accept(&stamped);
        if !decision.is_accepted() {
            info!(account = %stamped.account, timestamp = %stamped.timestamp, "stale snapshot dropped");
            return;
        }

        let result = self.reconciler.reconcile(account, &stamped.calendar_view()).await;
        // No subscribers is fine.
        let _ = self.updates.send(AcceptedUpdate { stamped, result });
    }
}
