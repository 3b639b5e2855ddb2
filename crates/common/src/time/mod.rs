//! Time utilities and abstractions
//!
//! - **Clock abstractions**: real and mock time (re-exported from testing)
//! - **[`deadline`]**: bounded awaiting of remote calls

pub mod deadline;

pub use deadline::{try_with_deadline, with_deadline};

// Re-export Clock abstractions from testing module
pub use crate::testing::time::{Clock, MockClock, SystemClock};
