//! # WashSlot Core
//!
//! Booking coordination logic - no portal, calendar or storage code.
//!
//! This crate contains:
//! - Port interfaces for the booking portal, the calendar and the audit trail
//! - The fetch cache, booking pipeline, ordering gate and calendar reconciler
//! - [`SlotSyncService`], which wires them together
//!
//! ## Architecture Principles
//! - Only depends on `washslot-common` and `washslot-domain`
//! - All external systems via traits
//! - Every call through a port runs under a deadline

pub mod booking;
pub mod fetch;
pub mod ordering;
pub mod reconcile;
pub mod service;

mod bounded;

// Ports
pub mod audit_ports;
pub mod calendar_ports;
pub mod slot_ports;

/// All port traits in one place.
pub mod ports {
    pub use crate::audit_ports::{AuditSink, NoopAuditSink};
    pub use crate::calendar_ports::CalendarSink;
    pub use crate::slot_ports::{ActionExecutor, SlotSource};
}

pub use booking::{BookingPipeline, BookingTicket};
pub use fetch::{FetchCache, FetchCacheStats, SnapshotFetcher};
pub use ordering::{GateDecision, OrderingGate};
pub use ports::*;
pub use reconcile::{CalendarReconciler, DayPlan};
pub use service::{AcceptedUpdate, RefreshSummary, SlotSyncService, SyncPorts};
