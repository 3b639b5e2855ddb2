//! Ordering Gate

pub mod gate;

pub use gate::{GateDecision, OrderingGate};
