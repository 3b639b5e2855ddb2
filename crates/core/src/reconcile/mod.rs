//! Calendar Reconciler and the pure desired-state builder it relies on.

pub mod desired;
pub mod reconciler;

pub use desired::{color_bucket, day_window, desired_events_for_day};
pub use reconciler::{plan_day, CalendarReconciler, DayPlan};
