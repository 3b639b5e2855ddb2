//! Calendar Reconciler
//!
//! Diffs the desired events of each snapshot day against what the calendar
//! holds and issues the minimal set of removals and inserts. Days are handled
//! one after another; a day whose events cannot be listed is skipped and the
//! rest proceed. Write failures are logged and counted, never raised.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};
use washslot_domain::{
    AccountConfig, CalendarDisplayConfig, DeadlineConfig, DesiredEvent, ReconciliationResult,
    RemoteEvent, Result, Snapshot, TimeSlot, WashSlotError,
};

use super::desired::{day_window, desired_events_for_day};
use crate::bounded::bounded;
use crate::calendar_ports::CalendarSink;

/// Writes needed to converge one day.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DayPlan<'a> {
    /// Remote events to delete, in remote listing order.
    pub removals: Vec<&'a RemoteEvent>,
    /// Desired events to insert after the removals.
    pub inserts: Vec<&'a DesiredEvent>,
}

/// Compute the writes that turn `remote` into `desired`.
///
/// Each desired event is matched to the first remote event whose start begins
/// with the desired start. Matches that are not equivalent are replaced.
/// Remote events no desired event claimed (orphans, and duplicates sharing a
/// start) are removed.
pub fn plan_day<'a>(desired: &'a [DesiredEvent], remote: &'a [RemoteEvent]) -> DayPlan<'a> {
    let mut claimed = vec![false; remote.len()];
    let mut replaced = vec![false; remote.len()];
    let mut inserts = Vec::new();

    for event in desired {
        let start = event.start.date_time.as_str();
        let matched = remote
            .iter()
            .position(|r| r.start_str().is_some_and(|remote_start| remote_start.starts_with(start)));

        match matched {
            Some(index) => {
                claimed[index] = true;
                if !remote[index].is_equivalent_to(event) {
                    replaced[index] = true;
                    inserts.push(event);
                }
            }
            None => inserts.push(event),
        }
    }

    let removals = remote
        .iter()
        .enumerate()
        .filter(|(index, _)| !claimed[*index] || replaced[*index])
        .map(|(_, event)| event)
        .collect();

    DayPlan { removals, inserts }
}

/// Applies accepted snapshots to the calendar.
pub struct CalendarReconciler {
    sink: Arc<dyn CalendarSink>,
    display: CalendarDisplayConfig,
    tz: Tz,
    deadlines: DeadlineConfig,
}

impl CalendarReconciler {
    pub fn new(
        sink: Arc<dyn CalendarSink>,
        display: CalendarDisplayConfig,
        deadlines: DeadlineConfig,
    ) -> Result<Self> {
        let tz = display.tz()?;
        Ok(Self { sink, display, tz, deadlines })
    }

    /// Reconcile every day of `snapshot` for `account`.
    ///
    /// Counts accumulate across days. No error escapes.
    #[instrument(skip(self, account, snapshot), fields(account = %account.account_id, days = snapshot.len()))]
    pub async fn reconcile(&self, account: &AccountConfig, snapshot: &Snapshot) -> ReconciliationResult {
        let mut total = ReconciliationResult::default();
        for (day, slots) in snapshot.days() {
            total.merge(self.reconcile_day(account, day, slots).await);
        }

        info!(
            pushes = total.pushes,
            removals = total.removals,
            failed_pushes = total.failed_pushes,
            failed_removals = total.failed_removals,
            skipped_days = total.skipped_days.len(),
            "calendar reconciled"
        );
        total
    }

    async fn reconcile_day(
        &self,
        account: &AccountConfig,
        day: NaiveDate,
        slots: &[TimeSlot],
    ) -> ReconciliationResult {
        let mut result = ReconciliationResult::default();
        let desired = desired_events_for_day(day, slots, account, &self.display);

        let remote = match self.list_day(account, day).await {
            Ok(events) => events,
            Err(err) => {
                warn!(%day, error = %err, "could not list calendar events, skipping day");
                result.skipped_days.push(day);
                return result;
            }
        };

        let plan = plan_day(&desired, &remote);
        debug!(
            %day,
            desired = desired.len(),
            remote = remote.len(),
            removals = plan.removals.len(),
            inserts = plan.inserts.len(),
            "day plan"
        );

        for event in plan.removals {
            let Some(id) = event.id.as_deref() else {
                warn!(%day, start = ?event.start_str(), "remote event has no id, cannot remove");
                continue;
            };

            result.removals += 1;
            if let Err(err) = self.remove(account, id).await {
                result.failed_removals += 1;
                warn!(%day, event_id = id, error = %err, "calendar removal failed");
            }
        }

        for event in plan.inserts {
            result.pushes += 1;
            if let Err(err) = self.push(account, event).await {
                result.failed_pushes += 1;
                warn!(%day, start = %event.start.date_time, error = %err, "calendar insert failed");
            }
        }

        result
    }

    async fn list_day(&self, account: &AccountConfig, day: NaiveDate) -> Result<Vec<RemoteEvent>> {
        let (start, end) = day_window(day, self.tz);
        bounded(
            "calendar.fetch_events",
            self.deadlines.calendar_read(),
            WashSlotError::CalendarFetch,
            self.sink.fetch_events(&account.account_id, start, end),
        )
        .await
    }

    async fn push(&self, account: &AccountConfig, event: &DesiredEvent) -> Result<()> {
        bounded(
            "calendar.push_event",
            self.deadlines.calendar_write(),
            WashSlotError::CalendarWrite,
            self.sink.push_event(&account.account_id, event),
        )
        .await
    }

    async fn remove(&self, account: &AccountConfig, id: &str) -> Result<()> {
        bounded(
            "calendar.remove_event",
            self.deadlines.calendar_write(),
            WashSlotError::CalendarWrite,
            self.sink.remove_event(&account.account_id, id),
        )
        .await
    }
}
