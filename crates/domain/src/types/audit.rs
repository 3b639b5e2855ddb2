//! Audit trail events
//!
//! Recorded after the corresponding operation succeeds. Storage is external.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::booking::CorrelationId;
use super::slots::{AccountId, GroupId, TimeRange};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditKind {
    Booked { day: NaiveDate, time: TimeRange, group: GroupId, correlation_id: CorrelationId },
    Unbooked { day: NaiveDate, time: TimeRange, group: GroupId, correlation_id: CorrelationId },
    CheckedStatus { day: NaiveDate },
    ListedGroups { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub account: AccountId,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AuditKind,
}

impl AuditEvent {
    pub fn new(account: AccountId, occurred_at: DateTime<Utc>, kind: AuditKind) -> Self {
        Self { account, occurred_at, kind }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            AuditKind::Booked { .. } => "booked",
            AuditKind::Unbooked { .. } => "unbooked",
            AuditKind::CheckedStatus { .. } => "checked_status",
            AuditKind::ListedGroups { .. } => "listed_groups",
        }
    }
}
