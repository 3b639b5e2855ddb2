//! Desired calendar state for one day
//!
//! Pure functions: no I/O, no clock. Given one day of portal state and the
//! account's display settings they produce the events the calendar should
//! hold and the window to list existing events in.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;
use washslot_domain::constants::{
    COLOR_SCALE, LOCATION_PREFIX, SELF_BOOKED_COLOR_ID, SUMMARY_SEPARATOR,
};
use washslot_domain::{
    AccountConfig, CalendarDisplayConfig, DesiredEvent, EventDateTime, SlotStatus, TimeSlot,
};

/// Color id for a range that is not self-booked.
///
/// `round(available / preferred * 5)` clamped to `1..=5` picks a bucket of
/// [`COLOR_SCALE`]. A zero preferred count is treated as one.
pub fn color_bucket(available: usize, preferred: usize) -> u8 {
    let preferred = preferred.max(1) as f64;
    let scaled = (available as f64 / preferred * COLOR_SCALE.len() as f64).round();
    let bucket = (scaled as usize).clamp(1, COLOR_SCALE.len());
    COLOR_SCALE[bucket - 1]
}

/// Unique labels of the slots with `status`, in portal order.
fn labels_with(slot: &TimeSlot, status: SlotStatus) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for group in slot.slots.iter().filter(|g| g.status == status) {
        let label = group.label();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Build the events the calendar should contain for `day`.
///
/// Ranges where every group is booked by someone else produce no event.
pub fn desired_events_for_day(
    day: NaiveDate,
    slots: &[TimeSlot],
    account: &AccountConfig,
    display: &CalendarDisplayConfig,
) -> Vec<DesiredEvent> {
    let root_url = display.root_url.trim_end_matches('/');

    slots
        .iter()
        .filter(|slot| slot.has_open_slot())
        .map(|slot| {
            let own = labels_with(slot, SlotStatus::Own);
            let bookable = labels_with(slot, SlotStatus::Bookable);
            let self_booked = !own.is_empty();

            let color_id = if self_booked {
                SELF_BOOKED_COLOR_ID
            } else {
                let available = slot.slots.len() - slot.count(SlotStatus::Booked);
                color_bucket(available, account.preferred_groups.len())
            };

            let mut clauses = Vec::new();
            if self_booked {
                clauses.push(format!("Booked by us: {}", own.join(", ")));
            }
            if !bookable.is_empty() {
                clauses.push(format!("{} available.", bookable.len()));
            }

            let end_day = if slot.time.crosses_midnight() {
                day.succ_opt().unwrap_or(day)
            } else {
                day
            };

            DesiredEvent {
                start: EventDateTime::new(
                    format!("{day}T{}:00", slot.time.start),
                    display.time_zone.clone(),
                ),
                end: EventDateTime::new(
                    format!("{end_day}T{}:00", slot.time.end),
                    display.time_zone.clone(),
                ),
                color_id,
                summary: clauses.join(SUMMARY_SEPARATOR),
                description: format!(
                    "{root_url}/book/?day={day}&time={}&id={}",
                    slot.time.start, account.account_id
                ),
                location: (!bookable.is_empty())
                    .then(|| format!("{LOCATION_PREFIX}{}", bookable.join(", "))),
                attendees: self_booked.then(|| account.invite_emails.clone()),
            }
        })
        .collect()
}

/// Local midnight of `day` to local midnight of the following day.
pub fn day_window(day: NaiveDate, tz: Tz) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start = local_midnight(day, tz);
    let end = local_midnight(day.succ_opt().unwrap_or(day), tz);
    let end = if end > start { end } else { start + Duration::days(1) };
    (start, end)
}

fn local_midnight(day: NaiveDate, tz: Tz) -> DateTime<FixedOffset> {
    let naive = day.and_time(NaiveTime::MIN);
    let local = tz.from_local_datetime(&naive).earliest().unwrap_or_else(|| tz.from_utc_datetime(&naive));
    local.with_timezone(&local.offset().fix())
}

#[cfg(test)]
mod tests {
    use washslot_domain::{GroupId, GroupSlot, TimeRange};

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn group(id: u32, status: SlotStatus) -> GroupSlot {
        GroupSlot { group_id: GroupId(id), group_name: format!("Grupp {id}"), status, pass_id: None }
    }

    fn account(preferred: u32) -> AccountConfig {
        AccountConfig::new("4711", (1..=preferred).map(GroupId).collect())
            .with_invitees(vec!["partner@example.com".into()])
    }

    fn display() -> CalendarDisplayConfig {
        CalendarDisplayConfig {
            root_url: "https://tvatt.example.com/".into(),
            time_zone: "Europe/Stockholm".into(),
        }
    }

    #[test]
    fn bucket_edges() {
        assert_eq!(color_bucket(7, 7), 10);
        assert_eq!(color_bucket(0, 7), 11);
        assert_eq!(color_bucket(1, 7), 11);
        assert_eq!(color_bucket(3, 5), 5);
        assert_eq!(color_bucket(9, 7), 10);
        assert_eq!(color_bucket(2, 0), 10);
    }

    #[test]
    fn bookable_range_text() {
        let slots = vec![TimeSlot {
            time: TimeRange::new("07:00", "10:00"),
            slots: vec![
                group(1, SlotStatus::Bookable),
                group(2, SlotStatus::Booked),
                group(3, SlotStatus::Bookable),
            ],
        }];

        let events = desired_events_for_day(day(), &slots, &account(3), &display());
        assert_eq!(events.len(), 1);
        let event = &events[0];

        assert_eq!(event.summary, "2 available.");
        assert_eq!(event.location.as_deref(), Some("Groups available: 1, 3"));
        assert_eq!(event.description, "https://tvatt.example.com/book/?day=2024-01-10&time=07:00&id=4711");
        assert_eq!(event.start.date_time, "2024-01-10T07:00:00");
        assert_eq!(event.end.date_time, "2024-01-10T10:00:00");
        assert_eq!(event.start.time_zone.as_deref(), Some("Europe/Stockholm"));
        assert_eq!(event.attendees, None);
        assert_eq!(event.color_id, color_bucket(2, 3));
    }

    #[test]
    fn self_booked_range_invites_and_uses_own_color() {
        let slots = vec![TimeSlot {
            time: TimeRange::new("10:00", "13:00"),
            slots: vec![group(4, SlotStatus::Own), group(5, SlotStatus::Bookable)],
        }];

        let event = &desired_events_for_day(day(), &slots, &account(7), &display())[0];
        assert_eq!(event.color_id, SELF_BOOKED_COLOR_ID);
        assert_eq!(event.summary, "Booked by us: 4 | 1 available.");
        assert_eq!(event.attendees, Some(vec!["partner@example.com".to_string()]));
    }

    #[test]
    fn fully_booked_range_has_no_event() {
        let slots = vec![TimeSlot {
            time: TimeRange::new("13:00", "16:00"),
            slots: vec![group(1, SlotStatus::Booked), group(2, SlotStatus::Booked)],
        }];

        assert!(desired_events_for_day(day(), &slots, &account(2), &display()).is_empty());
    }

    #[test]
    fn window_spans_local_day() {
        let tz: Tz = "Europe/Stockholm".parse().unwrap();
        let (start, end) = day_window(day(), tz);

        assert_eq!(start.to_rfc3339(), "2024-01-10T00:00:00+01:00");
        assert_eq!(end.to_rfc3339(), "2024-01-11T00:00:00+01:00");
    }

    #[test]
    fn window_on_dst_change_is_23_hours() {
        let tz: Tz = "Europe/Stockholm".parse().unwrap();
        let spring = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let (start, end) = day_window(spring, tz);

        assert_eq!(start.to_rfc3339(), "2024-03-31T00:00:00+01:00");
        assert_eq!(end.to_rfc3339(), "2024-04-01T00:00:00+02:00");
        assert_eq!(end - start, Duration::hours(23));
    }
}
