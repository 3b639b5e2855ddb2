//! # WashSlot Domain
//!
//! Business domain types and models for WashSlot.
//!
//! This crate contains:
//! - Slot data types (Snapshot, ResourceKey, ConflictKey, BookingIntent)
//! - Calendar event shapes (DesiredEvent, RemoteEvent, ReconciliationResult)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other WashSlot crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
