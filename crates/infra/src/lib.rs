//! # WashSlot Infrastructure
//!
//! Process-level plumbing around the core services.
//!
//! This crate contains:
//! - Configuration loading (TOML/JSON files with environment overrides)
//! - Logging setup
//! - The cron-driven refresh scheduler
//!
//! ## Architecture
//! - Depends on `washslot-core` and `washslot-domain`
//! - Portal and calendar adapters plug into the core port traits

pub mod config;
pub mod errors;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use errors::InfraError;
pub use observability::init_tracing;
pub use scheduling::{RefreshJob, RefreshScheduler, RefreshSchedulerConfig, SchedulerError};
