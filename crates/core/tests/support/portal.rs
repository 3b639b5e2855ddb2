use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use washslot_common::MockClock;
use washslot_core::{ActionExecutor, SlotSource};
use washslot_domain::{
    AccountId, AuthToken, BookingAction, BookingRequest, Group, GroupId, Result as DomainResult,
    SlotStatus, Snapshot, WashSlotError,
};

use super::fixtures::{open_slot, snapshot};

#[derive(Default)]
struct PortalState {
    world: Snapshot,
    failing_logins: HashSet<AccountId>,
    failing_fetches: usize,
    failing_groups: HashSet<GroupId>,
    fetched_dates: Vec<NaiveDate>,
    actions: Vec<BookingRequest>,
    groups: Vec<Group>,
}

/// In-memory booking portal.
///
/// Serves days from a seeded "world" snapshot and applies book/unbook
/// actions to it, so a refresh after an action sees the change. Days that were
/// never seeded come back with seven bookable groups in one morning range.
#[derive(Clone, Default)]
pub struct MockPortal {
    state: Arc<Mutex<PortalState>>,
    logins: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
    fetch_delay: Arc<Mutex<Duration>>,
    action_delay: Arc<Mutex<Duration>>,
    read_at_start: Arc<AtomicBool>,
    clock_step: Arc<Mutex<Option<(MockClock, Duration)>>>,
}

impl MockPortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_world(self, world: Snapshot) -> Self {
        self.state.lock().unwrap().world = world;
        self
    }

    pub fn with_groups(self, groups: Vec<Group>) -> Self {
        self.state.lock().unwrap().groups = groups;
        self
    }

    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fetch_delay.lock().unwrap() = delay;
        self
    }

    /// Capture the page when a fetch starts rather than when it returns, like
    /// a portal that renders before a slow response is delivered.
    pub fn reading_at_start(self) -> Self {
        self.read_at_start.store(true, Ordering::SeqCst);
        self
    }

    /// Advance `clock` by `step` on every fetch, so consecutive fetches
    /// complete at distinct instants.
    pub fn advancing(self, clock: MockClock, step: Duration) -> Self {
        *self.clock_step.lock().unwrap() = Some((clock, step));
        self
    }

    pub fn with_action_delay(self, delay: Duration) -> Self {
        *self.action_delay.lock().unwrap() = delay;
        self
    }

    pub fn fail_login_for(&self, account: &AccountId) {
        self.state.lock().unwrap().failing_logins.insert(account.clone());
    }

    /// The next `count` fetches fail with a scrape error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.state.lock().unwrap().failing_fetches = count;
    }

    pub fn fail_actions_for(&self, group: GroupId) {
        self.state.lock().unwrap().failing_groups.insert(group);
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fetched_dates(&self) -> Vec<NaiveDate> {
        self.state.lock().unwrap().fetched_dates.clone()
    }

    pub fn actions(&self) -> Vec<BookingRequest> {
        self.state.lock().unwrap().actions.clone()
    }

    fn week_of(state: &PortalState, date: NaiveDate) -> Snapshot {
        let end = date + ChronoDuration::days(7);
        let mut week = Snapshot::new();
        for (day, slots) in state.world.days() {
            if day >= date && day < end {
                week.insert_day(day, slots.to_vec());
            }
        }
        if week.is_empty() {
            week = snapshot(date, vec![open_slot("07:00", "10:00", 7)]);
        }
        week
    }
}

#[async_trait]
impl SlotSource for MockPortal {
    async fn login(&self, account: &AccountId) -> DomainResult<AuthToken> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().unwrap().failing_logins.contains(account) {
            return Err(WashSlotError::Auth(format!("bad credentials for {account}")));
        }
        Ok(AuthToken::new(format!("session-{account}")))
    }

    async fn fetch_slots(
        &self,
        _token: &AuthToken,
        _groups: &[GroupId],
        date: NaiveDate,
    ) -> DomainResult<Snapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let early = self
            .read_at_start
            .load(Ordering::SeqCst)
            .then(|| Self::week_of(&self.state.lock().unwrap(), date));
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some((clock, step)) = self.clock_step.lock().unwrap().as_ref() {
            clock.advance(*step);
        }

        let mut state = self.state.lock().unwrap();
        state.fetched_dates.push(date);
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(WashSlotError::Scrape("portal returned an error page".into()));
        }
        Ok(early.unwrap_or_else(|| Self::week_of(&state, date)))
    }

    async fn list_groups(&self, _token: &AuthToken) -> DomainResult<Vec<Group>> {
        Ok(self.state.lock().unwrap().groups.clone())
    }
}

#[async_trait]
impl ActionExecutor for MockPortal {
    async fn apply_action(&self, _token: &AuthToken, request: &BookingRequest) -> DomainResult<()> {
        let delay = *self.action_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.actions.push(request.clone());
        if state.failing_groups.contains(&request.group) {
            return Err(WashSlotError::Action(format!("group {} is locked", request.group)));
        }

        let status = match request.action {
            BookingAction::Book => SlotStatus::Own,
            BookingAction::Unbook => SlotStatus::Bookable,
        };
        let mut slots = state
            .world
            .day(request.day)
            .map(<[_]>::to_vec)
            .unwrap_or_else(|| vec![open_slot("07:00", "10:00", 7)]);
        for range in slots.iter_mut().filter(|s| s.time == request.time) {
            for group in range.slots.iter_mut().filter(|g| g.group_id == request.group) {
                group.status = status;
            }
        }
        state.world.insert_day(request.day, slots);
        Ok(())
    }
}
