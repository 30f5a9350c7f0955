//! Day anchors: weekday sets for weekly rules and day-of-month for monthly ones.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ResetError, Result};

/// A set of weekdays stored as a 7-bit mask, bit 0 = Sunday through bit 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DayOfWeekSet(u8);

const ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

impl DayOfWeekSet {
    pub const EMPTY: DayOfWeekSet = DayOfWeekSet(0);
    pub const WEEKDAYS: DayOfWeekSet = DayOfWeekSet(0b011_1110);
    pub const WEEKEND: DayOfWeekSet = DayOfWeekSet(0b100_0001);
    pub const ALL: DayOfWeekSet = DayOfWeekSet(0b111_1111);

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }

    /// Build a set from raw mask bits. Bits above bit 6 are rejected.
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !Self::ALL.0 != 0 {
            return Err(ResetError::InvalidConfiguration(format!(
                "weekday mask {bits:#09b} has bits outside Sunday..Saturday"
            )));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn single(day: Weekday) -> Self {
        Self(Self::bit(day))
    }

    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | Self::bit(day))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in Sunday-first order.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        ORDER.into_iter().filter(move |d| self.contains(*d))
    }

    /// Fails with `InvalidConfiguration` when the set is empty; rules and
    /// windows anchored on weekdays call this at construction.
    pub(crate) fn require_non_empty(self) -> Result<Self> {
        if self.is_empty() {
            return Err(ResetError::InvalidConfiguration(
                "at least one weekday must be specified".to_string(),
            ));
        }
        Ok(self)
    }
}

impl FromIterator<Weekday> for DayOfWeekSet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Display for DayOfWeekSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

/// Parse a weekday name such as `"mon"` or `"Monday"` (case-insensitive).
pub fn parse_weekday(s: &str) -> Result<Weekday> {
    Weekday::from_str(s).map_err(|_| ResetError::InvalidInput(format!("'{s}' is not a weekday")))
}

impl Serialize for DayOfWeekSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|d| d.to_string()))
    }
}

impl<'de> Deserialize<'de> for DayOfWeekSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|n| parse_weekday(n))
            .collect::<Result<DayOfWeekSet>>()
            .map_err(serde::de::Error::custom)
    }
}

/// Day-of-month anchor for monthly rules and windows.
///
/// A numbered day past the end of a short month is clamped to that month's last
/// day, so `Day(31)` fires on April 30 and February 28 (29 in leap years).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayOfMonth {
    Day(u8),
    Last,
}

impl DayOfMonth {
    /// A numbered day, 1 through 31.
    pub fn day(day: u32) -> Result<Self> {
        if !(1..=31).contains(&day) {
            return Err(ResetError::InvalidConfiguration(format!(
                "day of month must be 1-31 or last, got {day}"
            )));
        }
        Ok(Self::Day(day as u8))
    }

    pub(crate) fn validate(self) -> Result<Self> {
        match self {
            Self::Day(d) => Self::day(d as u32),
            Self::Last => Ok(self),
        }
    }

    /// The concrete day this anchor lands on in the given month.
    pub fn in_month(self, year: i32, month: u32) -> u32 {
        let last = days_in_month(year, month);
        match self {
            Self::Day(d) => (d as u32).min(last),
            Self::Last => last,
        }
    }

    /// Ordering key within a month: numbered days ascending, `Last` after all of them.
    pub(crate) fn sort_key(self) -> u32 {
        match self {
            Self::Day(d) => d as u32,
            Self::Last => u32::MAX,
        }
    }
}

impl fmt::Display for DayOfMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(d) => write!(f, "{d}"),
            Self::Last => f.write_str("last"),
        }
    }
}

impl Serialize for DayOfMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Day(d) => serializer.serialize_u8(*d),
            Self::Last => serializer.serialize_str("last"),
        }
    }
}

impl<'de> Deserialize<'de> for DayOfMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => DayOfMonth::day(n).map_err(serde::de::Error::custom),
            Raw::Text(t) if t.eq_ignore_ascii_case("last") => Ok(DayOfMonth::Last),
            Raw::Text(t) => Err(serde::de::Error::custom(format!(
                "day of month must be a number or \"last\", got '{t}'"
            ))),
        }
    }
}

/// Number of days in the given month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    first_of_month(year, month)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

pub(crate) fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}
