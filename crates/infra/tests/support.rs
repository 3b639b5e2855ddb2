//! Minimal port implementations for wiring a real `SlotSyncService` in
//! infrastructure tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use washslot_common::SystemClock;
use washslot_core::{
    ActionExecutor, CalendarSink, NoopAuditSink, SlotSource, SlotSyncService, SyncPorts,
};
use washslot_domain::{
    AccountConfig, AccountId, AuthToken, BookingRequest, Config, DesiredEvent, Group, GroupId,
    GroupSlot, RemoteEvent, Result as DomainResult, SlotStatus, Snapshot, TimeRange, TimeSlot,
    WashSlotError,
};

/// Portal that always serves one bookable morning range.
#[derive(Default)]
pub struct StaticPortal {
    rejected: Mutex<HashSet<AccountId>>,
    fetches: AtomicUsize,
}

impl StaticPortal {
    pub fn reject_login(&self, account: &str) {
        self.rejected.lock().unwrap().insert(AccountId::new(account));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlotSource for StaticPortal {
    async fn login(&self, account: &AccountId) -> DomainResult<AuthToken> {
        if self.rejected.lock().unwrap().contains(account) {
            return Err(WashSlotError::Auth(format!("login rejected for {account}")));
        }
        Ok(AuthToken::new("session"))
    }

    async fn fetch_slots(
        &self,
        _token: &AuthToken,
        groups: &[GroupId],
        date: NaiveDate,
    ) -> DomainResult<Snapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let slots = groups
            .iter()
            .map(|id| GroupSlot {
                group_id: *id,
                group_name: format!("Grupp {id}"),
                status: SlotStatus::Bookable,
                pass_id: None,
            })
            .collect();
        Ok(Snapshot::new()
            .with_day(date, vec![TimeSlot { time: TimeRange::new("07:00", "10:00"), slots }]))
    }

    async fn list_groups(&self, _token: &AuthToken) -> DomainResult<Vec<Group>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ActionExecutor for StaticPortal {
    async fn apply_action(&self, _token: &AuthToken, _request: &BookingRequest) -> DomainResult<()> {
        Ok(())
    }
}

/// Calendar that accepts every write and lists nothing.
#[derive(Default)]
pub struct BlackHoleCalendar {
    pub pushes: AtomicUsize,
}

#[async_trait]
impl CalendarSink for BlackHoleCalendar {
    async fn fetch_events(
        &self,
        _account: &AccountId,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> DomainResult<Vec<RemoteEvent>> {
        Ok(Vec::new())
    }

    async fn push_event(&self, _account: &AccountId, _event: &DesiredEvent) -> DomainResult<()> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_event(&self, _account: &AccountId, _id: &str) -> DomainResult<()> {
        Ok(())
    }
}

pub fn accounts(ids: &[&str]) -> Config {
    Config::new(
        ids.iter()
            .map(|id| AccountConfig::new(*id, vec![GroupId(1), GroupId(2)]).with_lookahead_weeks(1))
            .collect(),
    )
}

pub fn service(config: Config, portal: Arc<StaticPortal>) -> SlotSyncService {
    let ports = SyncPorts {
        source: portal.clone(),
        executor: portal,
        calendar: Arc::new(BlackHoleCalendar::default()),
        audit: Arc::new(NoopAuditSink),
    };
    SlotSyncService::start(Arc::new(config), ports, Arc::new(SystemClock)).unwrap()
}
