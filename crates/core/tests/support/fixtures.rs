use chrono::{NaiveDate, TimeZone, Utc};
use washslot_domain::{
    AccountConfig, AccountId, Config, GroupId, GroupSlot, SlotStatus, Snapshot, StampedSnapshot,
    TimeRange, TimeSlot,
};

pub const ACCOUNT: &str = "4711";

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

pub fn account_id() -> AccountId {
    AccountId::new(ACCOUNT)
}

pub fn account(id: &str, preferred: u32) -> AccountConfig {
    AccountConfig::new(id, (1..=preferred).map(GroupId).collect())
        .with_invitees(vec!["partner@example.com".into()])
        .with_lookahead_weeks(1)
}

/// One account with seven preferred groups and short deadlines.
pub fn config() -> Config {
    config_with(vec![account(ACCOUNT, 7)])
}

pub fn config_with(accounts: Vec<AccountConfig>) -> Config {
    let mut config = Config::new(accounts);
    config.calendar.root_url = "https://tvatt.example.com".into();
    config.calendar.time_zone = "Europe/Stockholm".into();
    config.deadlines.login_ms = 1_000;
    config.deadlines.fetch_ms = 1_000;
    config.deadlines.action_ms = 1_000;
    config.deadlines.calendar_read_ms = 1_000;
    config.deadlines.calendar_write_ms = 1_000;
    config.pipeline.worker_idle_ms = 200;
    config
}

pub fn group(id: u32, status: SlotStatus) -> GroupSlot {
    GroupSlot { group_id: GroupId(id), group_name: format!("Grupp {id}"), status, pass_id: None }
}

pub fn slot(start: &str, end: &str, groups: Vec<GroupSlot>) -> TimeSlot {
    TimeSlot { time: TimeRange::new(start, end), slots: groups }
}

/// A range where `open` of seven groups are bookable.
pub fn open_slot(start: &str, end: &str, open: u32) -> TimeSlot {
    let groups = (1..=7)
        .map(|id| group(id, if id <= open { SlotStatus::Bookable } else { SlotStatus::Booked }))
        .collect();
    slot(start, end, groups)
}

pub fn snapshot(day: NaiveDate, slots: Vec<TimeSlot>) -> Snapshot {
    Snapshot::new().with_day(day, slots)
}

pub fn stamped(snapshot: Snapshot, millis: i64) -> StampedSnapshot {
    StampedSnapshot::new(account_id(), snapshot, Utc.timestamp_millis_opt(millis).unwrap())
}
