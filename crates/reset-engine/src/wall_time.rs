//! Time-of-day values used as recurrence anchors.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ResetError, Result};

/// An immutable wall-clock time of day with millisecond precision.
///
/// Ordering is lexicographic on (hour, minute, second, millisecond), which is
/// the field declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallTime {
    hour: u8,
    minute: u8,
    second: u8,
    millisecond: u16,
}

impl WallTime {
    pub const MIDNIGHT: WallTime = WallTime {
        hour: 0,
        minute: 0,
        second: 0,
        millisecond: 0,
    };

    /// Build a wall time, rejecting any field outside its range with
    /// [`ResetError::OutOfRange`].
    pub fn new(hour: u32, minute: u32, second: u32, millisecond: u32) -> Result<Self> {
        if hour > 23 {
            return Err(ResetError::OutOfRange(format!(
                "hour must be between 0 and 23, got {hour}"
            )));
        }
        if minute > 59 {
            return Err(ResetError::OutOfRange(format!(
                "minute must be between 0 and 59, got {minute}"
            )));
        }
        if second > 59 {
            return Err(ResetError::OutOfRange(format!(
                "second must be between 0 and 59, got {second}"
            )));
        }
        if millisecond > 999 {
            return Err(ResetError::OutOfRange(format!(
                "millisecond must be between 0 and 999, got {millisecond}"
            )));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
            millisecond: millisecond as u16,
        })
    }

    /// Shorthand for `new(hour, minute, 0, 0)`.
    pub fn hm(hour: u32, minute: u32) -> Result<Self> {
        Self::new(hour, minute, 0, 0)
    }

    /// Shorthand for `new(hour, minute, second, 0)`.
    pub fn hms(hour: u32, minute: u32, second: u32) -> Result<Self> {
        Self::new(hour, minute, second, 0)
    }

    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    pub fn second(&self) -> u32 {
        self.second as u32
    }

    pub fn millisecond(&self) -> u32 {
        self.millisecond as u32
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Every field is range-checked at construction, so this never falls back.
        NaiveTime::from_hms_milli_opt(
            self.hour(),
            self.minute(),
            self.second(),
            self.millisecond(),
        )
        .unwrap_or(NaiveTime::MIN)
    }

    /// Combine with a calendar date into a local (offset-free) datetime.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }
}

impl From<NaiveTime> for WallTime {
    /// Sub-millisecond precision is truncated; a leap second maps to 59.999.
    fn from(t: NaiveTime) -> Self {
        let nanos = t.nanosecond();
        let (second, millisecond) = if nanos >= 1_000_000_000 {
            (59, 999)
        } else {
            (t.second(), nanos / 1_000_000)
        };
        Self {
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: second as u8,
            millisecond: millisecond as u16,
        }
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hour, self.minute, self.second, self.millisecond
        )
    }
}

impl FromStr for WallTime {
    type Err = ResetError;

    /// Accepts `HH:MM`, `HH:MM:SS` and `HH:MM:SS.mmm`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ResetError::InvalidInput(format!("'{s}' is not a time of day"));

        let (hms, millis) = match s.split_once('.') {
            Some((hms, ms)) => {
                if ms.is_empty() || ms.len() > 3 || !ms.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                // ".5" means 500 ms, not 5 ms.
                let scaled = format!("{ms:0<3}");
                (hms, scaled.parse::<u32>().map_err(|_| invalid())?)
            }
            None => (s, 0),
        };

        let parts: Vec<&str> = hms.split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid());
        }
        let mut fields = [0u32; 3];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }
        if parts.len() == 2 && millis != 0 {
            return Err(invalid());
        }

        WallTime::new(fields[0], fields[1], fields[2], millis)
    }
}

impl Serialize for WallTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
