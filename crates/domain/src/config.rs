//! Configuration structures
//!
//! Loading lives in `washslot-infra`; this module only defines the shape,
//! the defaults and validation.

use std::collections::HashSet;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACTION_DEADLINE_MS, DEFAULT_CALENDAR_READ_DEADLINE_MS,
    DEFAULT_CALENDAR_WRITE_DEADLINE_MS, DEFAULT_FETCH_DEADLINE_MS, DEFAULT_LOGIN_DEADLINE_MS,
    DEFAULT_LOOKAHEAD_WEEKS, DEFAULT_REFRESH_CRON, DEFAULT_REFRESH_JOB_TIMEOUT_SECS,
    DEFAULT_ROOT_URL, DEFAULT_TIME_ZONE, DEFAULT_WORKER_IDLE_MS,
};
use crate::errors::{Result, WashSlotError};
use crate::types::{AccountId, GroupId, ScopeKey};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub calendar: CalendarDisplayConfig,
    #[serde(default)]
    pub deadlines: DeadlineConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn new(accounts: Vec<AccountConfig>) -> Self {
        Self {
            accounts,
            calendar: CalendarDisplayConfig::default(),
            deadlines: DeadlineConfig::default(),
            pipeline: PipelineConfig::default(),
            ordering: OrderingConfig::default(),
            refresh: RefreshConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn account(&self, id: &AccountId) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| &a.account_id == id)
    }

    /// Reject configurations the services cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            return Err(WashSlotError::Config("at least one account is required".into()));
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(&account.account_id) {
                return Err(WashSlotError::Config(format!(
                    "duplicate account id '{}'",
                    account.account_id
                )));
            }
            if account.preferred_groups.is_empty() {
                return Err(WashSlotError::Config(format!(
                    "account '{}' has no preferred groups",
                    account.account_id
                )));
            }
        }

        self.calendar.tz()?;
        self.deadlines.validate()?;

        if self.pipeline.worker_idle_ms == 0 {
            return Err(WashSlotError::Config("pipeline.worker_idle_ms must be positive".into()));
        }

        Ok(())
    }
}

/// One portal account and how its availability is mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub account_id: AccountId,
    pub preferred_groups: Vec<GroupId>,
    pub main_email: String,
    #[serde(default)]
    pub invite_emails: Vec<String>,
    #[serde(default = "default_lookahead_weeks")]
    pub lookahead_weeks: u32,
}

impl AccountConfig {
    pub fn new(account_id: impl Into<String>, preferred_groups: Vec<GroupId>) -> Self {
        Self {
            account_id: AccountId::new(account_id),
            preferred_groups,
            main_email: String::new(),
            invite_emails: Vec::new(),
            lookahead_weeks: DEFAULT_LOOKAHEAD_WEEKS,
        }
    }

    pub fn with_main_email(mut self, email: impl Into<String>) -> Self {
        self.main_email = email.into();
        self
    }

    pub fn with_invitees(mut self, emails: Vec<String>) -> Self {
        self.invite_emails = emails;
        self
    }

    pub fn with_lookahead_weeks(mut self, weeks: u32) -> Self {
        self.lookahead_weeks = weeks;
        self
    }
}

fn default_lookahead_weeks() -> u32 {
    DEFAULT_LOOKAHEAD_WEEKS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarDisplayConfig {
    /// Base URL of the booking front end, used for deep links.
    pub root_url: String,
    /// IANA zone the portal times are expressed in.
    pub time_zone: String,
}

impl CalendarDisplayConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| WashSlotError::Config(format!("invalid time_zone '{}': {e}", self.time_zone)))
    }
}

impl Default for CalendarDisplayConfig {
    fn default() -> Self {
        Self { root_url: DEFAULT_ROOT_URL.to_string(), time_zone: DEFAULT_TIME_ZONE.to_string() }
    }
}

/// Deadlines for every call that leaves the process, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    pub login_ms: u64,
    pub fetch_ms: u64,
    pub action_ms: u64,
    pub calendar_read_ms: u64,
    pub calendar_write_ms: u64,
}

impl DeadlineConfig {
    pub fn login(&self) -> Duration {
        Duration::from_millis(self.login_ms)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn calendar_read(&self) -> Duration {
        Duration::from_millis(self.calendar_read_ms)
    }

    pub fn calendar_write(&self) -> Duration {
        Duration::from_millis(self.calendar_write_ms)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("login_ms", self.login_ms),
            ("fetch_ms", self.fetch_ms),
            ("action_ms", self.action_ms),
            ("calendar_read_ms", self.calendar_read_ms),
            ("calendar_write_ms", self.calendar_write_ms),
        ];
        match fields.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => {
                Err(WashSlotError::Config(format!("deadlines.{name} must be positive")))
            }
            None => Ok(()),
        }
    }
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            login_ms: DEFAULT_LOGIN_DEADLINE_MS,
            fetch_ms: DEFAULT_FETCH_DEADLINE_MS,
            action_ms: DEFAULT_ACTION_DEADLINE_MS,
            calendar_read_ms: DEFAULT_CALENDAR_READ_DEADLINE_MS,
            calendar_write_ms: DEFAULT_CALENDAR_WRITE_DEADLINE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How long a conflict-key worker waits for new intents before exiting.
    pub worker_idle_ms: u64,
}

impl PipelineConfig {
    pub fn worker_idle(&self) -> Duration {
        Duration::from_millis(self.worker_idle_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { worker_idle_ms: DEFAULT_WORKER_IDLE_MS }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingScope {
    /// One last-accepted timestamp per account.
    #[default]
    Account,
    /// A single feed shared by every account.
    Global,
}

impl OrderingScope {
    pub fn key_for(&self, account: &AccountId) -> ScopeKey {
        match self {
            Self::Account => ScopeKey::Account(account.clone()),
            Self::Global => ScopeKey::Global,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    pub scope: OrderingScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,
    /// Six-field cron expression (seconds first).
    pub cron: String,
    pub job_timeout_secs: u64,
}

impl RefreshConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: DEFAULT_REFRESH_CRON.to_string(),
            job_timeout_secs: DEFAULT_REFRESH_JOB_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
