//! Domain types and models

pub mod audit;
pub mod booking;
pub mod calendar;
pub mod slots;

pub use audit::{AuditEvent, AuditKind};
pub use booking::{
    BookingAction, BookingIntent, BookingRequest, ConflictKey, CorrelationId, ScopeKey,
    SettledBatch, StampedSnapshot,
};
pub use calendar::{DesiredEvent, EventDateTime, ReconciliationResult, RemoteEvent};
pub use slots::{
    group_label, AccountId, AuthToken, Group, GroupId, GroupSlot, ResourceKey, Snapshot,
    SlotStatus, TimeRange, TimeSlot,
};
