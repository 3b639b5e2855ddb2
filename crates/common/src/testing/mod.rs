//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: async assertions and polling helpers
//! - **[`time`]**: clock abstraction with a controllable mock
//!
//! [`time::SystemClock`] is the production clock; it lives here so the mock
//! and the real implementation share one trait definition.

pub mod async_utils;
pub mod time;

pub use async_utils::{poll_until, timeout_ok};
pub use time::{Clock, MockClock, SystemClock};
