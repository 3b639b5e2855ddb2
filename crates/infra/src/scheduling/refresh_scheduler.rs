//! Cron-driven portal refresh.
//!
//! Triggers a [`RefreshJob`] on a cron schedule. Join handles are tracked,
//! cancellation is explicit, and every asynchronous operation is wrapped in a
//! timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use washslot_domain::RefreshConfig;
//! use washslot_infra::scheduling::{RefreshJob, RefreshScheduler, SchedulerResult};
//!
//! # async fn example(job: Arc<dyn RefreshJob>) -> SchedulerResult<()> {
//! let refresh = RefreshConfig::default();
//! if let Some(mut scheduler) = RefreshScheduler::from_refresh_config(&refresh, job).await? {
//!     scheduler.start().await?;
//!     // ... application runs ...
//!     scheduler.stop().await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use washslot_common::error::{ErrorClassification, ErrorSeverity};
use washslot_core::SlotSyncService;
use washslot_domain::RefreshConfig;

use crate::errors::InfraError;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Work the scheduler triggers.
#[async_trait]
pub trait RefreshJob: Send + Sync {
    /// Execute one refresh.
    async fn run(&self) -> Result<(), InfraError>;
}

/// A scheduled refresh covers every account. It only fails when no account
/// could be refreshed; partial failures are logged by the service.
#[async_trait]
impl RefreshJob for SlotSyncService {
    async fn run(&self) -> Result<(), InfraError> {
        let mut summary = self.refresh_all().await;
        if summary.refreshed.is_empty() && !summary.failed.is_empty() {
            let (_, err) = summary.failed.swap_remove(0);
            return Err(InfraError(err));
        }
        Ok(())
    }
}

/// Configuration for the refresh scheduler.
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single job execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        Self::from(&RefreshConfig::default())
    }
}

impl From<&RefreshConfig> for RefreshSchedulerConfig {
    fn from(refresh: &RefreshConfig) -> Self {
        Self {
            cron_expression: refresh.cron.clone(),
            job_timeout: refresh.job_timeout(),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome counters across all runs.
#[derive(Debug, Default)]
pub struct RefreshRunStats {
    runs: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

impl RefreshRunStats {
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::SeqCst)
    }
}

/// Refresh scheduler with explicit lifecycle management.
pub struct RefreshScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: RefreshSchedulerConfig,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    stats: Arc<RefreshRunStats>,
    job: Arc<dyn RefreshJob>,
}

impl RefreshScheduler {
    /// Create a scheduler from the application refresh settings.
    ///
    /// Returns `None` when scheduled refresh is disabled.
    pub async fn from_refresh_config(
        refresh: &RefreshConfig,
        job: Arc<dyn RefreshJob>,
    ) -> SchedulerResult<Option<Self>> {
        if !refresh.enabled {
            info!("Scheduled refresh disabled");
            return Ok(None);
        }
        Self::with_config(RefreshSchedulerConfig::from(refresh), job).await.map(Some)
    }

    /// Create a scheduler with a custom configuration.
    pub async fn with_config(
        config: RefreshSchedulerConfig,
        job: Arc<dyn RefreshJob>,
    ) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            stats: Arc::new(RefreshRunStats::default()),
            job,
        };

        scheduler.job_id = scheduler.register_refresh_job().await?;
        Ok(scheduler)
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
        .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_task(cancel).await;
        });

        self.monitor_handle = Some(handle);
        info!(cron = %self.config.cron_expression, "Refresh scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
        .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Refresh scheduler stopped");
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Run the job now, outside the schedule, under the same timeout.
    pub async fn run_once(&self) -> Result<(), InfraError> {
        execute(self.job.as_ref(), self.config.job_timeout, &self.stats).await
    }

    pub fn stats(&self) -> &RefreshRunStats {
        &self.stats
    }

    async fn register_refresh_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let cron_expr = self.config.cron_expression.clone();
        let stats = self.stats.clone();
        let job = self.job.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let stats = stats.clone();
            let job = job.clone();

            Box::pin(async move {
                // Failures are counted and logged inside.
                let _ = execute(job.as_ref(), job_timeout, &stats).await;
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(format!("{cron_expr}: {e}")))?;

        let job_id = job_definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job_definition)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered refresh job");
        Ok(job_id)
    }

    async fn monitor_task(cancel: CancellationToken) {
        cancel.cancelled().await;
        debug!("Refresh scheduler monitor cancelled");
    }
}

async fn execute(
    job: &dyn RefreshJob,
    job_timeout: Duration,
    stats: &RefreshRunStats,
) -> Result<(), InfraError> {
    stats.runs.fetch_add(1, Ordering::SeqCst);
    let started = Instant::now();

    match tokio::time::timeout(job_timeout, job.run()).await {
        Ok(Ok(())) => {
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Refresh finished");
            Ok(())
        }
        Ok(Err(err)) => {
            stats.failures.fetch_add(1, Ordering::SeqCst);
            if err.severity() >= ErrorSeverity::Error {
                error!(error = %err, kind = err.0.kind(), "Refresh failed");
            } else {
                warn!(error = %err, kind = err.0.kind(), retryable = err.is_retryable(), "Refresh failed");
            }
            Err(err)
        }
        Err(_) => {
            stats.timeouts.fetch_add(1, Ordering::SeqCst);
            warn!(timeout_secs = job_timeout.as_secs(), "Refresh timed out");
            Err(SchedulerError::Timeout { seconds: job_timeout.as_secs() }.into())
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("RefreshScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
