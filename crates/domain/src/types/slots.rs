//! Portal slot state
//!
//! A [`Snapshot`] is the parsed view of the booking portal for one or more
//! days. Each day holds the time ranges the portal offers and, per range, the
//! status of every machine group the account watches.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::impl_wire_name_conversions;

/// Portal rental id identifying one account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Numeric machine group id as used by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bookable machine group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// Opaque portal session credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Session cookies never end up in logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// Taken by another tenant.
    Booked,
    /// Taken by this account.
    Own,
    Bookable,
}

impl_wire_name_conversions!(SlotStatus {
    Booked => "booked",
    Own => "own",
    Bookable => "bookable",
});

/// Portal time-of-day range, `HH:MM` on both ends.
///
/// Ends may be lexicographically earlier than starts for ranges that cross
/// midnight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: start.into(), end: end.into() }
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Status of a single group within one time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSlot {
    pub group_id: GroupId,
    pub group_name: String,
    pub status: SlotStatus,
    /// Portal pass id, needed to unbook.
    pub pass_id: Option<String>,
}

impl GroupSlot {
    /// Short label used in calendar text: the number after "Grupp", or the
    /// full name when the portal uses some other naming.
    pub fn label(&self) -> String {
        group_label(&self.group_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: TimeRange,
    pub slots: Vec<GroupSlot>,
}

impl TimeSlot {
    pub fn is_self_booked(&self) -> bool {
        self.slots.iter().any(|s| s.status == SlotStatus::Own)
    }

    pub fn has_open_slot(&self) -> bool {
        self.slots.iter().any(|s| s.status != SlotStatus::Booked)
    }

    pub fn count(&self, status: SlotStatus) -> usize {
        self.slots.iter().filter(|s| s.status == status).count()
    }
}

/// Day-indexed portal state. Days iterate in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    days: BTreeMap<NaiveDate, Vec<TimeSlot>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, day: NaiveDate, slots: Vec<TimeSlot>) -> Self {
        self.days.insert(day, slots);
        self
    }

    pub fn insert_day(&mut self, day: NaiveDate, slots: Vec<TimeSlot>) {
        self.days.insert(day, slots);
    }

    pub fn day(&self, day: NaiveDate) -> Option<&[TimeSlot]> {
        self.days.get(&day).map(Vec::as_slice)
    }

    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, &[TimeSlot])> {
        self.days.iter().map(|(day, slots)| (*day, slots.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Copy restricted to a single day; empty when the day is absent.
    pub fn restricted_to(&self, day: NaiveDate) -> Self {
        let mut out = Self::new();
        if let Some(slots) = self.days.get(&day) {
            out.days.insert(day, slots.clone());
        }
        out
    }
}

/// Identity of one logical remote-state fetch.
///
/// Group ids are sorted and deduplicated on construction so that keys built
/// from the same set compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    account: AccountId,
    date: NaiveDate,
    groups: Vec<GroupId>,
}

impl ResourceKey {
    pub fn new(account: AccountId, date: NaiveDate, groups: impl IntoIterator<Item = GroupId>) -> Self {
        let mut groups: Vec<GroupId> = groups.into_iter().collect();
        groups.sort_unstable();
        groups.dedup();
        Self { account, date, groups }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.groups.iter().map(ToString::to_string).collect();
        write!(f, "{}/{}/[{}]", self.account, self.date, groups.join(","))
    }
}

/// Group number inside a portal group name, e.g. "Tvättstuga Grupp 12".
static GROUP_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Grupp\s*(\d+)").expect("GROUP_NUMBER_REGEX pattern is valid and well-formed")
});

/// Extract the numeric group label from a portal group name.
pub fn group_label(name: &str) -> String {
    GROUP_NUMBER_REGEX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| name.to_string(), |number| number.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn resource_key_ignores_group_order() {
        let account = AccountId::new("1234");
        let a = ResourceKey::new(account.clone(), date(2024, 1, 10), [GroupId(3), GroupId(1), GroupId(3)]);
        let b = ResourceKey::new(account, date(2024, 1, 10), [GroupId(1), GroupId(3)]);

        assert_eq!(a, b);
        assert_eq!(a.groups(), &[GroupId(1), GroupId(3)]);
        assert_eq!(a.to_string(), "1234/2024-01-10/[1,3]");
    }

    #[test]
    fn group_label_extracts_number() {
        assert_eq!(group_label("Grupp 4"), "4");
        assert_eq!(group_label("Tvättstuga Grupp12 (källare)"), "12");
        assert_eq!(group_label("Torkrum"), "Torkrum");
        assert_eq!(group_label("Grupp"), "Grupp");
    }

    #[test]
    fn group_label_skips_words_that_only_start_with_grupp() {
        assert_eq!(group_label("Grupprum Grupp 3"), "3");
        assert_eq!(group_label("Grupprum"), "Grupprum");
    }

    #[test]
    fn snapshot_iterates_days_in_order() {
        let snapshot = Snapshot::new()
            .with_day(date(2024, 1, 12), vec![])
            .with_day(date(2024, 1, 10), vec![]);

        let days: Vec<NaiveDate> = snapshot.days().map(|(d, _)| d).collect();
        assert_eq!(days, vec![date(2024, 1, 10), date(2024, 1, 12)]);

        let focused = snapshot.restricted_to(date(2024, 1, 12));
        assert_eq!(focused.len(), 1);
        assert!(snapshot.restricted_to(date(2024, 2, 1)).is_empty());
    }

    #[test]
    fn range_crossing_midnight() {
        assert!(TimeRange::new("23:00", "01:00").crosses_midnight());
        assert!(!TimeRange::new("07:00", "10:00").crosses_midnight());
    }

    #[test]
    fn auth_token_debug_is_redacted() {
        let token = AuthToken::new("PHPSESSID=secret");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
        assert_eq!(token.expose(), "PHPSESSID=secret");
    }
}
