//! Schedules: recurring sets of activity windows.
//!
//! A [`Schedule`] answers three questions about its windows: which one contains
//! an instant ([`Schedule::current_window`]), which one starts next after an
//! instant ([`Schedule::next_window_after`]), and which ones overlap a range
//! ([`Schedule::windows_in`]).
//!
//! Searches walk anchor periods (days for daily and weekly schedules, months
//! for monthly ones) in chronological order. Inside a period every definition
//! is resolved to a concrete window and the windows are ordered by
//! `(start, end)` before matching, so the first match is the earliest even
//! when clamping puts two monthly definitions on the same date.
//!
//! Local schedules resolve a window's local start and local end independently,
//! so a window that straddles a DST change is an hour longer or shorter in
//! absolute time than its nominal duration. A window whose resolved end is not
//! after its resolved start is skipped.

use std::collections::VecDeque;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::clock::{Clock, SystemClock};
use crate::days::first_of_month;
use crate::dst::{resolve_local, to_local, DstPolicy};
use crate::error::{ResetError, Result};
use crate::snapshot::ScheduleSnapshot;
use crate::window::{evaluation_order, AnchorKind, ScheduleWindow, WindowAnchor, WindowDefinition};

/// Anchor days before the reference day examined by `current_window`.
pub const DAILY_LOOKBACK_DAYS: i64 = 1;
/// Anchor days after the reference day examined by `next_window_after`.
pub const DAILY_LOOKAHEAD_DAYS: i64 = 2;
pub const WEEKLY_LOOKBACK_DAYS: i64 = 7;
pub const WEEKLY_LOOKAHEAD_DAYS: i64 = 14;
pub const MONTHLY_LOOKBACK_MONTHS: u32 = 1;
pub const MONTHLY_LOOKAHEAD_MONTHS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Plan {
    Recurring {
        kind: AnchorKind,
        definitions: Vec<WindowDefinition>,
        /// Longest nominal duration; widens lookbacks for multi-day windows.
        longest: Duration,
    },
    OneTime(ScheduleWindow),
}

/// A set of activity windows, global (UTC) or bound to one zone.
#[derive(Debug, Clone)]
pub struct Schedule<C = SystemClock> {
    plan: Plan,
    zone: Option<(Tz, DstPolicy)>,
    clock: C,
}

impl<C: Clock> Schedule<C> {
    /// A recurring schedule on the UTC calendar.
    ///
    /// # Errors
    /// [`ResetError::InvalidConfiguration`] if `definitions` is empty or mixes
    /// anchor kinds.
    pub fn global(definitions: impl IntoIterator<Item = WindowDefinition>, clock: C) -> Result<Self> {
        Ok(Self {
            plan: recurring_plan(definitions)?,
            zone: None,
            clock,
        })
    }

    /// A recurring schedule on `zone`'s wall clock.
    pub fn local(
        definitions: impl IntoIterator<Item = WindowDefinition>,
        zone: Tz,
        policy: DstPolicy,
        clock: C,
    ) -> Result<Self> {
        Ok(Self {
            plan: recurring_plan(definitions)?,
            zone: Some((zone, policy)),
            clock,
        })
    }

    /// A schedule with exactly one absolute window.
    pub fn one_time(start: DateTime<Utc>, end: DateTime<Utc>, clock: C) -> Result<Self> {
        Ok(Self {
            plan: Plan::OneTime(ScheduleWindow::new(start, end)?),
            zone: None,
            clock,
        })
    }

    /// A schedule with exactly one window given in `zone`'s wall-clock time.
    /// Both ends are resolved once, here.
    pub fn one_time_local(
        start: NaiveDateTime,
        end: NaiveDateTime,
        zone: Tz,
        policy: DstPolicy,
        clock: C,
    ) -> Result<Self> {
        let start_utc = resolve_local(start, &zone, policy)?;
        let end_utc = resolve_local(end, &zone, policy)?;
        Ok(Self {
            plan: Plan::OneTime(ScheduleWindow::new(start_utc, end_utc)?),
            zone: Some((zone, policy)),
            clock,
        })
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.zone.map(|(tz, _)| tz)
    }

    pub fn policy(&self) -> Option<DstPolicy> {
        self.zone.map(|(_, policy)| policy)
    }

    /// Definitions in evaluation order; empty for one-time schedules.
    pub fn definitions(&self) -> &[WindowDefinition] {
        match &self.plan {
            Plan::Recurring { definitions, .. } => definitions,
            Plan::OneTime(_) => &[],
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The window containing `reference`, if any.
    pub fn current_window(&self, reference: DateTime<Utc>) -> Result<Option<ScheduleWindow>> {
        let (kind, longest) = match &self.plan {
            Plan::OneTime(window) => return Ok(window.contains(reference).then_some(*window)),
            Plan::Recurring { kind, longest, .. } => (*kind, *longest),
        };
        let anchor = self.local_date(reference);
        let periods = match kind {
            AnchorKind::Daily => {
                let back = lookback_days(DAILY_LOOKBACK_DAYS, longest);
                day_range(anchor, -back, DAILY_LOOKBACK_DAYS)
            }
            AnchorKind::Weekly => day_range(anchor, -lookback_days(WEEKLY_LOOKBACK_DAYS, longest), 0),
            AnchorKind::Monthly => {
                let back = lookback_months(longest);
                month_range(anchor, back, back + 1)
            }
        };
        self.first_match(periods, |w| w.contains(reference))
    }

    /// The first window starting strictly after `reference`, if any.
    pub fn next_window_after(&self, reference: DateTime<Utc>) -> Result<Option<ScheduleWindow>> {
        let kind = match &self.plan {
            Plan::OneTime(window) => return Ok((reference < window.start).then_some(*window)),
            Plan::Recurring { kind, .. } => *kind,
        };
        let anchor = self.local_date(reference);
        let periods = match kind {
            AnchorKind::Daily => day_range(anchor, 0, DAILY_LOOKAHEAD_DAYS),
            AnchorKind::Weekly => day_range(anchor, 0, WEEKLY_LOOKAHEAD_DAYS),
            AnchorKind::Monthly => month_range(anchor, 0, MONTHLY_LOOKAHEAD_MONTHS),
        };
        self.first_match(periods, |w| w.start > reference)
    }

    /// The first window starting after the clock's current instant.
    pub fn next_window(&self) -> Result<Option<ScheduleWindow>> {
        self.next_window_after(self.clock.now())
    }

    /// All windows intersecting `[from, to)`, in ascending start order.
    ///
    /// The returned iterator is lazy: each anchor period is resolved only when
    /// the iteration reaches it. A DST error ends the iteration after it is
    /// yielded.
    ///
    /// # Errors
    /// [`ResetError::InvalidConfiguration`] if `to <= from`.
    pub fn windows_in(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Windows<'_, C>> {
        if to <= from {
            return Err(ResetError::InvalidConfiguration(format!(
                "range end {to} must be after start {from}"
            )));
        }
        let periods = match &self.plan {
            Plan::OneTime(_) => VecDeque::new(),
            Plan::Recurring { kind, longest, .. } => {
                let first = self.local_date(from);
                let last = self.local_date(to);
                match kind {
                    AnchorKind::Daily => {
                        days_between(first, last, lookback_days(DAILY_LOOKBACK_DAYS, *longest))
                    }
                    AnchorKind::Weekly => {
                        days_between(first, last, lookback_days(WEEKLY_LOOKBACK_DAYS, *longest))
                    }
                    AnchorKind::Monthly => months_between(first, last, lookback_months(*longest)),
                }
            }
        };
        let pending = match &self.plan {
            Plan::OneTime(window) if window.intersects(from, to) => VecDeque::from([*window]),
            _ => VecDeque::new(),
        };
        Ok(Windows {
            schedule: self,
            from,
            to,
            periods,
            pending,
            last_yielded: None,
            done: false,
        })
    }

    /// Snapshot at the clock's current instant.
    pub fn snapshot(&self) -> Result<ScheduleSnapshot> {
        self.snapshot_at(self.clock.now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Result<ScheduleSnapshot> {
        let current = self.current_window(now)?;
        let next = self.next_window_after(now)?;
        Ok(ScheduleSnapshot::at(now, current, next))
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match &self.zone {
            Some((tz, _)) => to_local(instant, tz).date(),
            None => instant.date_naive(),
        }
    }

    fn resolve(&self, local: NaiveDateTime) -> Result<DateTime<Utc>> {
        match &self.zone {
            Some((tz, policy)) => resolve_local(local, tz, *policy),
            None => Ok(local.and_utc()),
        }
    }

    fn first_match(
        &self,
        periods: Vec<NaiveDate>,
        matches: impl Fn(&ScheduleWindow) -> bool,
    ) -> Result<Option<ScheduleWindow>> {
        for period in periods {
            let mut windows = self.period_windows(period)?;
            windows.sort();
            if let Some(window) = windows.into_iter().find(|w| matches(w)) {
                return Ok(Some(window));
            }
        }
        Ok(None)
    }

    fn period_windows(&self, period: NaiveDate) -> Result<Vec<ScheduleWindow>> {
        let mut windows = Vec::new();
        for definition in self.definitions() {
            if let Some(window) = self.window_for(definition, period)? {
                windows.push(window);
            }
        }
        Ok(windows)
    }

    /// The window a definition produces in one anchor period. `period` is the
    /// anchor day for daily and weekly definitions and the first of the month
    /// for monthly ones.
    fn window_for(
        &self,
        definition: &WindowDefinition,
        period: NaiveDate,
    ) -> Result<Option<ScheduleWindow>> {
        let (date, start) = match *definition.anchor() {
            WindowAnchor::Daily { start } => (period, start),
            WindowAnchor::Weekly { days, start } => {
                if !days.contains(period.weekday()) {
                    return Ok(None);
                }
                (period, start)
            }
            WindowAnchor::Monthly { day, start } => {
                let target = day.in_month(period.year(), period.month());
                match period.with_day(target) {
                    Some(date) => (date, start),
                    None => return Ok(None),
                }
            }
        };

        let local_start = start.on(date);
        let local_end = local_start
            .checked_add_signed(definition.duration())
            .ok_or_else(|| {
                ResetError::OutOfRange(format!(
                    "window starting {local_start} with duration {} ends out of range",
                    definition.duration()
                ))
            })?;
        let start_utc = self.resolve(local_start)?;
        let end_utc = self.resolve(local_end)?;
        if end_utc <= start_utc {
            tracing::debug!(%local_start, "window collapsed by DST transition, skipped");
            return Ok(None);
        }
        Ok(Some(ScheduleWindow {
            start: start_utc,
            end: end_utc,
        }))
    }
}

/// Lazy, ordered iterator over the windows intersecting a range.
///
/// Created by [`Schedule::windows_in`]. Clone it to restart from the same
/// position.
#[derive(Debug, Clone)]
pub struct Windows<'a, C> {
    schedule: &'a Schedule<C>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    periods: VecDeque<NaiveDate>,
    pending: VecDeque<ScheduleWindow>,
    last_yielded: Option<ScheduleWindow>,
    done: bool,
}

impl<C: Clock> Iterator for Windows<'_, C> {
    type Item = Result<ScheduleWindow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(window) = self.pending.pop_front() {
                if self.last_yielded == Some(window) {
                    continue;
                }
                self.last_yielded = Some(window);
                return Some(Ok(window));
            }

            let Some(period) = self.periods.pop_front() else {
                self.done = true;
                return None;
            };
            tracing::trace!(%period, "expanding schedule period");

            match self.schedule.period_windows(period) {
                Ok(mut windows) => {
                    windows.retain(|w| w.intersects(self.from, self.to));
                    windows.sort();
                    windows.dedup();
                    self.pending.extend(windows);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn recurring_plan(definitions: impl IntoIterator<Item = WindowDefinition>) -> Result<Plan> {
    let mut definitions: Vec<WindowDefinition> = definitions.into_iter().collect();
    let Some(first) = definitions.first() else {
        return Err(ResetError::InvalidConfiguration(
            "at least one window definition must be provided".to_string(),
        ));
    };
    let kind = first.anchor().kind();
    if let Some(other) = definitions.iter().find(|d| d.anchor().kind() != kind) {
        return Err(ResetError::InvalidConfiguration(format!(
            "schedule mixes {:?} and {:?} window definitions",
            kind,
            other.anchor().kind()
        )));
    }
    definitions.sort_by(evaluation_order);
    let longest = definitions
        .iter()
        .map(WindowDefinition::duration)
        .max()
        .unwrap_or_else(Duration::zero);
    Ok(Plan::Recurring {
        kind,
        definitions,
        longest,
    })
}

/// Days of lookback: the base horizon, or enough to cover the longest window.
fn lookback_days(base: i64, longest: Duration) -> i64 {
    base.max(longest.num_days() + 1)
}

fn lookback_months(longest: Duration) -> u32 {
    let months = (longest.num_days() / 28 + 1).clamp(1, i64::from(u32::MAX)) as u32;
    MONTHLY_LOOKBACK_MONTHS.max(months)
}

/// Anchor days `anchor + before ..= anchor + after`.
fn day_range(anchor: NaiveDate, before: i64, after: i64) -> Vec<NaiveDate> {
    (before..=after)
        .filter_map(|offset| anchor.checked_add_signed(Duration::days(offset)))
        .collect()
}

/// Firsts of `count` consecutive months starting `back` months before `anchor`'s month.
fn month_range(anchor: NaiveDate, back: u32, count: u32) -> Vec<NaiveDate> {
    let Some(start) = first_of_month(anchor.year(), anchor.month())
        .and_then(|m| m.checked_sub_months(Months::new(back)))
    else {
        return Vec::new();
    };
    (0..count)
        .filter_map(|i| start.checked_add_months(Months::new(i)))
        .collect()
}

/// `margin` days before `first` through the day after `last`.
fn days_between(first: NaiveDate, last: NaiveDate, margin: i64) -> VecDeque<NaiveDate> {
    let (Some(start), Some(end)) = (
        first.checked_sub_signed(Duration::days(margin)),
        last.checked_add_signed(Duration::days(1)),
    ) else {
        return VecDeque::new();
    };
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// `back` months of margin before `first`'s month through one month after `last`'s.
fn months_between(first: NaiveDate, last: NaiveDate, back: u32) -> VecDeque<NaiveDate> {
    let (Some(start), Some(end)) = (
        first_of_month(first.year(), first.month())
            .and_then(|m| m.checked_sub_months(Months::new(back))),
        first_of_month(last.year(), last.month()).and_then(|m| m.checked_add_months(Months::new(1))),
    ) else {
        return VecDeque::new();
    };
    let mut months = VecDeque::new();
    let mut cursor = start;
    while cursor <= end {
        months.push_back(cursor);
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    months
}
