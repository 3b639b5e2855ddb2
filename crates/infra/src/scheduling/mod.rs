//! Scheduling infrastructure for automated task execution
//!
//! Provides the cron-based scheduler that triggers the periodic portal
//! refresh. Lifecycle is explicit:
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations

pub mod error;
pub mod refresh_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use refresh_scheduler::{
    RefreshJob, RefreshRunStats, RefreshScheduler, RefreshSchedulerConfig,
};
