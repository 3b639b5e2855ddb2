//! Slot sync service: wires the fetcher, pipeline, gate and reconciler
//! together behind one handle.

pub mod slot_sync;

pub use slot_sync::{AcceptedUpdate, RefreshSummary, SlotSyncService, SyncPorts};
