use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use washslot_core::CalendarSink;
use washslot_domain::{
    AccountId, DesiredEvent, RemoteEvent, Result as DomainResult, WashSlotError,
};

#[derive(Default)]
struct CalendarState {
    events: Vec<RemoteEvent>,
    failing_days: HashSet<NaiveDate>,
    failing_writes: bool,
    listed_windows: Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
}

/// In-memory calendar holding the events of a single account.
///
/// Listing returns the events whose start falls on the window's first local
/// day, which is how a real calendar answers the reconciler's day windows.
#[derive(Clone, Default)]
pub struct MockCalendar {
    state: Arc<Mutex<CalendarState>>,
    pushes: Arc<AtomicUsize>,
    removals: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing remote event.
    pub fn with_event(self, event: RemoteEvent) -> Self {
        self.state.lock().unwrap().events.push(event);
        self
    }

    pub fn fail_listing_for(&self, day: NaiveDate) {
        self.state.lock().unwrap().failing_days.insert(day);
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().failing_writes = true;
    }

    pub fn events(&self) -> Vec<RemoteEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn events_on(&self, day: NaiveDate) -> Vec<RemoteEvent> {
        let prefix = day.to_string();
        self.events()
            .into_iter()
            .filter(|e| e.start_str().is_some_and(|s| s.starts_with(&prefix)))
            .collect()
    }

    pub fn listed_windows(&self) -> Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        self.state.lock().unwrap().listed_windows.clone()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn removal_count(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarSink for MockCalendar {
    async fn fetch_events(
        &self,
        _account: &AccountId,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> DomainResult<Vec<RemoteEvent>> {
        let day = start.date_naive();
        let mut state = self.state.lock().unwrap();
        state.listed_windows.push((start, end));
        if state.failing_days.contains(&day) {
            return Err(WashSlotError::CalendarFetch(format!("listing {day} failed")));
        }

        let prefix = day.to_string();
        Ok(state
            .events
            .iter()
            .filter(|e| e.start_str().is_some_and(|s| s.starts_with(&prefix)))
            .cloned()
            .collect())
    }

    async fn push_event(&self, _account: &AccountId, event: &DesiredEvent) -> DomainResult<()> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.failing_writes {
            return Err(WashSlotError::CalendarWrite("insert rejected".into()));
        }

        let mut remote = RemoteEvent::from(event);
        remote.id = Some(format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        state.events.push(remote);
        Ok(())
    }

    async fn remove_event(&self, _account: &AccountId, id: &str) -> DomainResult<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.failing_writes {
            return Err(WashSlotError::CalendarWrite("delete rejected".into()));
        }
        state.events.retain(|e| e.id.as_deref() != Some(id));
        Ok(())
    }
}
