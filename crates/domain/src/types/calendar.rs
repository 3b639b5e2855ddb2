//! Calendar event shapes exchanged with the calendar collaborator

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wall-clock instant as the calendar service represents it.
///
/// Desired events carry a local `YYYY-MM-DDTHH:MM:SS` string plus a zone
/// name; remote events usually carry a full RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn new(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self { date_time: date_time.into(), time_zone: Some(time_zone.into()) }
    }
}

/// An event the calendar should contain, derived from one time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredEvent {
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub color_id: u8,
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    /// Invitee emails; only present when the range is self-booked.
    pub attendees: Option<Vec<String>>,
}

/// An event as reported by the calendar collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    pub id: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub color_id: Option<u8>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl RemoteEvent {
    pub fn start_str(&self) -> Option<&str> {
        self.start.as_ref().map(|s| s.date_time.as_str())
    }

    /// Whether this remote event already represents `desired`.
    ///
    /// Only the first line of the description is compared. Attendees compare
    /// as a set.
    pub fn is_equivalent_to(&self, desired: &DesiredEvent) -> bool {
        let first_line = |text: &str| text.lines().next().unwrap_or_default().to_string();

        let remote_attendees: BTreeSet<&str> = self.attendees.iter().map(String::as_str).collect();
        let desired_attendees: BTreeSet<&str> =
            desired.attendees.iter().flatten().map(String::as_str).collect();

        self.summary.as_deref() == Some(desired.summary.as_str())
            && self.color_id == Some(desired.color_id)
            && self.location == desired.location
            && self.description.as_deref().map(first_line) == Some(first_line(&desired.description))
            && remote_attendees == desired_attendees
    }
}

impl From<&DesiredEvent> for RemoteEvent {
    fn from(event: &DesiredEvent) -> Self {
        Self {
            id: None,
            start: Some(event.start.clone()),
            end: Some(event.end.clone()),
            color_id: Some(event.color_id),
            summary: Some(event.summary.clone()),
            description: Some(event.description.clone()),
            location: event.location.clone(),
            attendees: event.attendees.clone().unwrap_or_default(),
        }
    }
}

/// Write counts for one reconciliation run.
///
/// `pushes` and `removals` count attempted writes; the `failed_*` fields
/// count the subset whose collaborator call failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub pushes: usize,
    pub removals: usize,
    pub failed_pushes: usize,
    pub failed_removals: usize,
    /// Days whose remote events could not be listed.
    pub skipped_days: Vec<NaiveDate>,
}

impl ReconciliationResult {
    pub fn is_noop(&self) -> bool {
        self.pushes == 0 && self.removals == 0
    }

    pub fn merge(&mut self, other: Self) {
        self.pushes += other.pushes;
        self.removals += other.removals;
        self.failed_pushes += other.failed_pushes;
        self.failed_removals += other.failed_removals;
        self.skipped_days.extend(other.skipped_days);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desired() -> DesiredEvent {
        DesiredEvent {
            start: EventDateTime::new("2024-01-10T07:00:00", "Europe/Stockholm"),
            end: EventDateTime::new("2024-01-10T10:00:00", "Europe/Stockholm"),
            color_id: 3,
            summary: "Booked by us: 1".into(),
            description: "http://host/book/?day=2024-01-10&time=07:00&id=42".into(),
            location: None,
            attendees: Some(vec!["a@example.com".into(), "b@example.com".into()]),
        }
    }

    #[test]
    fn equivalence_ignores_attendee_order_and_trailing_description() {
        let desired = desired();
        let mut remote = RemoteEvent::from(&desired);
        remote.attendees.reverse();
        remote.description = Some(format!("{}\nedited by hand", desired.description));

        assert!(remote.is_equivalent_to(&desired));
    }

    #[test]
    fn equivalence_detects_changed_color() {
        let desired = desired();
        let mut remote = RemoteEvent::from(&desired);
        remote.color_id = Some(10);

        assert!(!remote.is_equivalent_to(&desired));
    }

    #[test]
    fn merge_accumulates_counts() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut total = ReconciliationResult { pushes: 1, ..Default::default() };
        total.merge(ReconciliationResult {
            removals: 2,
            failed_removals: 1,
            skipped_days: vec![day],
            ..Default::default()
        });

        assert_eq!(total.pushes, 1);
        assert_eq!(total.removals, 2);
        assert_eq!(total.failed_removals, 1);
        assert_eq!(total.skipped_days, vec![day]);
        assert!(!total.is_noop());
    }
}
