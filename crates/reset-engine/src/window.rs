//! Window definitions and concrete schedule windows.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::days::{DayOfMonth, DayOfWeekSet};
use crate::error::{ResetError, Result};
use crate::wall_time::WallTime;

/// A concrete half-open activity interval `[start, end)` in absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduleWindow {
    /// # Errors
    /// [`ResetError::InvalidConfiguration`] if `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(ResetError::InvalidConfiguration(format!(
                "window end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Whether the window overlaps `[from, to)`. Touching endpoints do not count.
    pub fn intersects(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start < to && self.end > from
    }
}

/// The recurring anchor a window starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowAnchor {
    Daily { start: WallTime },
    Weekly { days: DayOfWeekSet, start: WallTime },
    Monthly { day: DayOfMonth, start: WallTime },
}

/// Which kind of anchor a schedule's definitions share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    Daily,
    Weekly,
    Monthly,
}

impl WindowAnchor {
    pub fn kind(&self) -> AnchorKind {
        match self {
            Self::Daily { .. } => AnchorKind::Daily,
            Self::Weekly { .. } => AnchorKind::Weekly,
            Self::Monthly { .. } => AnchorKind::Monthly,
        }
    }

    pub fn start(&self) -> WallTime {
        match self {
            Self::Daily { start } | Self::Weekly { start, .. } | Self::Monthly { start, .. } => {
                *start
            }
        }
    }
}

/// Longest accepted window duration. Searches look back far enough to cover
/// the longest window, so this also bounds their cost.
pub const MAX_WINDOW_DAYS: i64 = 366;

/// A recurring window: an anchor plus a strictly positive wall-clock duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowDefinition {
    anchor: WindowAnchor,
    duration: Duration,
}

impl WindowDefinition {
    /// # Errors
    /// [`ResetError::InvalidConfiguration`] for a duration that is not positive
    /// or exceeds [`MAX_WINDOW_DAYS`], an empty weekday set or a bad day of month.
    pub fn new(anchor: WindowAnchor, duration: Duration) -> Result<Self> {
        if duration <= Duration::zero() {
            return Err(ResetError::InvalidConfiguration(format!(
                "window duration must be positive, got {duration}"
            )));
        }
        if duration > Duration::days(MAX_WINDOW_DAYS) {
            return Err(ResetError::InvalidConfiguration(format!(
                "window duration {duration} exceeds {MAX_WINDOW_DAYS} days"
            )));
        }
        let anchor = match anchor {
            WindowAnchor::Weekly { days, start } => WindowAnchor::Weekly {
                days: days.require_non_empty()?,
                start,
            },
            WindowAnchor::Monthly { day, start } => WindowAnchor::Monthly {
                day: day.validate()?,
                start,
            },
            daily @ WindowAnchor::Daily { .. } => daily,
        };
        Ok(Self { anchor, duration })
    }

    pub fn daily(start: WallTime, duration: Duration) -> Result<Self> {
        Self::new(WindowAnchor::Daily { start }, duration)
    }

    pub fn weekly(days: DayOfWeekSet, start: WallTime, duration: Duration) -> Result<Self> {
        Self::new(WindowAnchor::Weekly { days, start }, duration)
    }

    pub fn monthly(day: DayOfMonth, start: WallTime, duration: Duration) -> Result<Self> {
        Self::new(WindowAnchor::Monthly { day, start }, duration)
    }

    pub fn anchor(&self) -> &WindowAnchor {
        &self.anchor
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Order in which [`Schedule::definitions`](crate::Schedule::definitions)
/// lists definitions: monthly ones by day of month (`Last` after every
/// numbered day), then all kinds by start time.
pub(crate) fn evaluation_order(a: &WindowDefinition, b: &WindowDefinition) -> Ordering {
    let day_key = |d: &WindowDefinition| match d.anchor {
        WindowAnchor::Monthly { day, .. } => day.sort_key(),
        _ => 0,
    };
    day_key(a)
        .cmp(&day_key(b))
        .then_with(|| a.anchor.start().cmp(&b.anchor.start()))
}
