//! Booking intents and the snapshots they produce

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slots::{AccountId, GroupId, Snapshot, TimeRange};
use crate::impl_wire_name_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Book,
    Unbook,
}

impl_wire_name_conversions!(BookingAction {
    Book => "book",
    Unbook => "unbook",
});

/// Per-request id handed back to the caller on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a caller asks for. Becomes a [`BookingIntent`] once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub account: AccountId,
    pub day: NaiveDate,
    pub time: TimeRange,
    pub group: GroupId,
    pub action: BookingAction,
}

impl BookingRequest {
    pub fn book(account: AccountId, day: NaiveDate, time: TimeRange, group: GroupId) -> Self {
        Self { account, day, time, group, action: BookingAction::Book }
    }

    pub fn unbook(account: AccountId, day: NaiveDate, time: TimeRange, group: GroupId) -> Self {
        Self { account, day, time, group, action: BookingAction::Unbook }
    }

    pub fn conflict_key(&self) -> ConflictKey {
        ConflictKey { account: self.account.clone(), day: self.day, time: self.time.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingIntent {
    pub request: BookingRequest,
    pub correlation_id: CorrelationId,
}

impl BookingIntent {
    pub fn new(request: BookingRequest) -> Self {
        Self { request, correlation_id: CorrelationId::new() }
    }
}

/// Intents sharing a key are never applied to the portal concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictKey {
    pub account: AccountId,
    pub day: NaiveDate,
    pub time: TimeRange,
}

impl fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account, self.day, self.time)
    }
}

/// Partition of the ordering gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKey {
    Account(AccountId),
    Global,
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(account) => write!(f, "account:{account}"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// A snapshot tagged with its producer's completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampedSnapshot {
    pub account: AccountId,
    pub snapshot: Snapshot,
    pub timestamp: DateTime<Utc>,
    /// When set, only this day is written to the calendar.
    pub focus_day: Option<NaiveDate>,
}

impl StampedSnapshot {
    pub fn new(account: AccountId, snapshot: Snapshot, timestamp: DateTime<Utc>) -> Self {
        Self { account, snapshot, timestamp, focus_day: None }
    }

    pub fn focused_on(mut self, day: NaiveDate) -> Self {
        self.focus_day = Some(day);
        self
    }

    /// The part of the snapshot that should reach the calendar.
    pub fn calendar_view(&self) -> Snapshot {
        match self.focus_day {
            Some(day) => self.snapshot.restricted_to(day),
            None => self.snapshot.clone(),
        }
    }
}

/// Outcome delivered to every caller whose intent succeeded in a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledBatch {
    pub snapshot: Snapshot,
    pub timestamp: DateTime<Utc>,
    pub correlation_ids: Vec<CorrelationId>,
}
