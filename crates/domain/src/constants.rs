//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Calendar colors
/// Color ids from least to most available.
pub const COLOR_SCALE: [u8; 5] = [11, 6, 5, 2, 10];
pub const SELF_BOOKED_COLOR_ID: u8 = 3;

// Calendar text
pub const SUMMARY_SEPARATOR: &str = " | ";
pub const LOCATION_PREFIX: &str = "Groups available: ";

// Configuration defaults
pub const DEFAULT_TIME_ZONE: &str = "Europe/Stockholm";
pub const DEFAULT_ROOT_URL: &str = "http://localhost:8080";
pub const DEFAULT_LOOKAHEAD_WEEKS: u32 = 2;
pub const DEFAULT_REFRESH_CRON: &str = "0 */15 * * * *";
pub const DEFAULT_REFRESH_JOB_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_WORKER_IDLE_MS: u64 = 60_000;

// Deadlines (milliseconds)
pub const DEFAULT_LOGIN_DEADLINE_MS: u64 = 15_000;
pub const DEFAULT_FETCH_DEADLINE_MS: u64 = 30_000;
pub const DEFAULT_ACTION_DEADLINE_MS: u64 = 15_000;
pub const DEFAULT_CALENDAR_READ_DEADLINE_MS: u64 = 10_000;
pub const DEFAULT_CALENDAR_WRITE_DEADLINE_MS: u64 = 10_000;

pub const DAYS_PER_WEEK: i64 = 7;
