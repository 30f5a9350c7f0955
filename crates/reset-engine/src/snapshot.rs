//! Point-in-time summary of a schedule.

use chrono::{DateTime, Duration, Utc};

use crate::window::ScheduleWindow;

/// Whether a schedule is active at an instant, and how long until that changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub is_active: bool,
    /// Zero while active. `None` when inactive with no upcoming window.
    pub time_until_start: Option<Duration>,
    /// Zero while inactive.
    pub time_until_end: Duration,
    pub current_window: Option<ScheduleWindow>,
    pub next_window: Option<ScheduleWindow>,
}

impl ScheduleSnapshot {
    /// Derive a snapshot from the search results at `now`. Durations are
    /// clamped to be non-negative.
    pub fn at(
        now: DateTime<Utc>,
        current_window: Option<ScheduleWindow>,
        next_window: Option<ScheduleWindow>,
    ) -> Self {
        let clamp = |d: Duration| d.max(Duration::zero());

        let (is_active, time_until_start, time_until_end) = match current_window {
            Some(current) => (true, Some(Duration::zero()), clamp(current.end - now)),
            None => (
                false,
                next_window.map(|next| clamp(next.start - now)),
                Duration::zero(),
            ),
        };

        Self {
            is_active,
            time_until_start,
            time_until_end,
            current_window,
            next_window,
        }
    }
}
