//! Booking Pipeline
//!
//! Every [`ConflictKey`] (account, day, time range) gets its own worker task
//! and FIFO queue. A worker applies intents one at a time. Intents that arrive
//! while earlier ones are being applied join the same settlement window. Once
//! the queue is drained the window closes, and the worker fetches one fresh
//! snapshot for the day and hands it to every caller in the window. That
//! fetch may join another caller's fetch only if it started after the window
//! closed. Intents that arrive during the fetch wait for the next window.
//!
//! Workers exit after an idle period. The exit happens under the registry lock
//! after a final queue check, so an intent is never handed to a worker that is
//! already gone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};
use washslot_common::Clock;
use washslot_domain::{
    AuditEvent, AuditKind, AuthToken, BookingAction, BookingIntent, BookingRequest, Config,
    ConflictKey, CorrelationId, Result, SettledBatch, StampedSnapshot, WashSlotError,
};

use crate::audit_ports::AuditSink;
use crate::bounded::bounded;
use crate::fetch::SnapshotFetcher;
use crate::slot_ports::ActionExecutor;

type Reply = oneshot::Sender<Result<SettledBatch>>;

struct Submission {
    intent: BookingIntent,
    reply: Reply,
}

/// Handle returned to a caller on submission.
#[derive(Debug)]
pub struct BookingTicket {
    correlation_id: CorrelationId,
    receiver: oneshot::Receiver<Result<SettledBatch>>,
}

impl BookingTicket {
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Wait for the window containing this intent to settle.
    ///
    /// Resolves to the shared batch when this intent succeeded and the
    /// refresh succeeded; otherwise to this intent's own error or the
    /// refresh error.
    pub async fn outcome(self) -> Result<SettledBatch> {
        self.receiver
            .await
            .map_err(|_| WashSlotError::Internal("booking worker stopped before settling".into()))?
    }
}

struct PipelineInner {
    config: Arc<Config>,
    fetcher: Arc<SnapshotFetcher>,
    executor: Arc<dyn ActionExecutor>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    feed: Option<mpsc::UnboundedSender<StampedSnapshot>>,
    idle: Duration,
    workers: Mutex<HashMap<ConflictKey, mpsc::UnboundedSender<Submission>>>,
}

/// Serializes booking actions per conflict key and batches their refreshes.
#[derive(Clone)]
pub struct BookingPipeline {
    inner: Arc<PipelineInner>,
}

impl BookingPipeline {
    /// Create a pipeline. Settled snapshots, focused on their booked day, are
    /// forwarded to `feed` when one is given.
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<SnapshotFetcher>,
        executor: Arc<dyn ActionExecutor>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        feed: Option<mpsc::UnboundedSender<StampedSnapshot>>,
    ) -> Self {
        let idle = config.pipeline.worker_idle();
        Self {
            inner: Arc::new(PipelineInner {
                config,
                fetcher,
                executor,
                audit,
                clock,
                feed,
                idle,
                workers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Queue a booking request behind earlier ones for the same slot.
    ///
    /// Fails immediately with `NotFound` for an unconfigured account.
    pub fn submit(&self, request: BookingRequest) -> Result<BookingTicket> {
        if self.inner.config.account(&request.account).is_none() {
            return Err(WashSlotError::NotFound(format!("account '{}'", request.account)));
        }

        let intent = BookingIntent::new(request);
        let correlation_id = intent.correlation_id;
        let key = intent.request.conflict_key();
        let (reply, receiver) = oneshot::channel();
        let mut submission = Submission { intent, reply };

        let mut workers = self.inner.workers.lock();
        if let Some(queue) = workers.get(&key) {
            match queue.send(submission) {
                Ok(()) => {
                    debug!(%key, %correlation_id, "queued behind running worker");
                    return Ok(BookingTicket { correlation_id, receiver });
                }
                Err(mpsc::error::SendError(returned)) => submission = returned,
            }
        }

        let (queue, rx) = mpsc::unbounded_channel();
        if queue.send(submission).is_err() {
            return Err(WashSlotError::Internal("fresh worker queue closed".into()));
        }
        workers.insert(key.clone(), queue);
        drop(workers);

        debug!(%key, %correlation_id, "starting worker");
        tokio::spawn(run_worker(Arc::clone(&self.inner), key, rx));

        Ok(BookingTicket { correlation_id, receiver })
    }

    /// Number of conflict keys with a live worker.
    pub fn active_workers(&self) -> usize {
        self.inner.workers.lock().len()
    }
}

async fn run_worker(
    inner: Arc<PipelineInner>,
    key: ConflictKey,
    mut rx: mpsc::UnboundedReceiver<Submission>,
) {
    while let Some(first) = next_window_start(&inner, &key, &mut rx).await {
        settle_window(&inner, &key, first, &mut rx).await;
    }
    debug!(%key, "worker exited");
}

/// Wait for the first intent of the next window, or exit when idle.
async fn next_window_start(
    inner: &PipelineInner,
    key: &ConflictKey,
    rx: &mut mpsc::UnboundedReceiver<Submission>,
) -> Option<Submission> {
    match tokio::time::timeout(inner.idle, rx.recv()).await {
        Ok(next) => next,
        Err(_) => {
            let mut workers = inner.workers.lock();
            match rx.try_recv() {
                Ok(submission) => Some(submission),
                Err(_) => {
                    workers.remove(key);
                    None
                }
            }
        }
    }
}

struct Applied {
    reply: Reply,
    correlation_id: CorrelationId,
    outcome: Result<()>,
}

#[instrument(skip_all, fields(%key))]
async fn settle_window(
    inner: &PipelineInner,
    key: &ConflictKey,
    first: Submission,
    rx: &mut mpsc::UnboundedReceiver<Submission>,
) {
    let mut applied = Vec::new();
    let mut session: Option<AuthToken> = None;
    let mut next = Some(first);

    while let Some(Submission { intent, reply }) = next.take() {
        let outcome = match apply_intent(inner, &intent).await {
            Ok(token) => {
                session = Some(token);
                Ok(())
            }
            Err(err) => {
                warn!(correlation_id = %intent.correlation_id, error = %err, "intent failed");
                Err(err)
            }
        };
        applied.push(Applied { reply, correlation_id: intent.correlation_id, outcome });
        next = rx.try_recv().ok();
    }

    let correlation_ids: Vec<CorrelationId> = applied.iter().map(|a| a.correlation_id).collect();
    info!(intents = applied.len(), "settlement window closed, refreshing");

    // The refresh runs even when every intent failed. It must not settle for
    // a fetch that started before the window's actions were applied.
    let watermark = inner.fetcher.watermark();
    let refreshed = match inner.config.account(&key.account) {
        Some(account) => inner.fetcher.fetch_after(account, key.day, session, watermark).await,
        None => Err(WashSlotError::NotFound(format!("account '{}'", key.account))),
    };

    let settled = refreshed.map(|snapshot| SettledBatch {
        snapshot,
        timestamp: now_utc(inner.clock.as_ref()),
        correlation_ids,
    });

    match &settled {
        Ok(batch) => {
            if let Some(feed) = &inner.feed {
                let stamped =
                    StampedSnapshot::new(key.account.clone(), batch.snapshot.clone(), batch.timestamp)
                        .focused_on(key.day);
                if feed.send(stamped).is_err() {
                    warn!("snapshot feed closed, calendar will not be updated");
                }
            }
        }
        Err(err) => warn!(error = %err, "refresh after booking failed"),
    }

    for Applied { reply, outcome, .. } in applied {
        let delivery = match outcome {
            Ok(()) => settled.clone(),
            Err(err) => Err(err),
        };
        // The caller may have stopped waiting.
        let _ = reply.send(delivery);
    }
}

/// Log in and apply one intent. Returns the session used.
async fn apply_intent(inner: &PipelineInner, intent: &BookingIntent) -> Result<AuthToken> {
    let request = &intent.request;
    let token = inner.fetcher.login(&request.account).await?;

    bounded(
        "portal.apply_action",
        inner.fetcher.deadlines().action(),
        WashSlotError::Action,
        inner.executor.apply_action(&token, request),
    )
    .await?;

    info!(
        correlation_id = %intent.correlation_id,
        action = %request.action,
        group = %request.group,
        "booking action applied"
    );
    record_audit(inner, intent).await;
    Ok(token)
}

async fn record_audit(inner: &PipelineInner, intent: &BookingIntent) {
    let request = &intent.request;
    let (day, time, group, correlation_id) =
        (request.day, request.time.clone(), request.group, intent.correlation_id);
    let kind = match request.action {
        BookingAction::Book => AuditKind::Booked { day, time, group, correlation_id },
        BookingAction::Unbook => AuditKind::Unbooked { day, time, group, correlation_id },
    };
    let event = AuditEvent::new(request.account.clone(), now_utc(inner.clock.as_ref()), kind);
    if let Err(err) = inner.audit.record(event).await {
        warn!(error = %err, "audit record failed");
    }
}

pub(crate) fn now_utc(clock: &dyn Clock) -> DateTime<Utc> {
    DateTime::<Utc>::from(clock.system_time())
}

