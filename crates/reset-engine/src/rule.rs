//! Recurrence rules: when does a reset fire next?
//!
//! A [`RecurrenceRule`] couples a [`Recurrence`] pattern with a [`Locality`].
//! Global rules are evaluated directly on the UTC calendar; local rules are
//! evaluated on the wall clock of a caller-supplied zone and converted back via
//! [`crate::dst::resolve_local`].
//!
//! Every evaluation returns the earliest firing instant strictly after the
//! last-fired instant it was given.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::days::{first_of_month, DayOfMonth, DayOfWeekSet};
use crate::dst::{resolve_local, to_local, DstPolicy, Zone};
use crate::error::{ResetError, Result};
use crate::wall_time::WallTime;

/// Days examined by a weekly search, starting from the last-fired date.
pub const WEEKLY_HORIZON_DAYS: usize = 8;
/// Months examined by a monthly search, starting from the last-fired month.
pub const MONTHLY_HORIZON_MONTHS: u32 = 13;

/// Whether a rule runs on the UTC calendar or on a player's local calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locality {
    #[default]
    Global,
    Local(DstPolicy),
}

/// Target of a one-shot [`Recurrence::OnceAt`] rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnceTarget {
    /// A fixed absolute instant; the rule is global.
    Absolute(DateTime<Utc>),
    /// A local wall-clock instant, resolved in the zone supplied at evaluation.
    Local(NaiveDateTime),
}

/// The recurrence pattern of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recurrence {
    Daily { at: WallTime },
    Weekly { days: DayOfWeekSet, at: WallTime },
    Monthly { day: DayOfMonth, at: WallTime },
    /// Kept sorted ascending and free of duplicates by [`RecurrenceRule::new`].
    MultipleTimesPerDay { times: Vec<WallTime> },
    FixedInterval { interval: Duration },
    /// One-shot; the caller stops asking once it has observed the firing.
    AfterFixedDuration { duration: Duration },
    OnceAt { target: OnceTarget },
}

/// A validated recurrence pattern with a fixed locality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrenceRule {
    recurrence: Recurrence,
    locality: Locality,
}

impl RecurrenceRule {
    /// Validate and normalize a recurrence with the given locality.
    ///
    /// # Errors
    /// [`ResetError::InvalidConfiguration`] for an empty weekday set, a bad
    /// day of month, an empty or duplicated time list, a non-positive
    /// interval or duration, or a `OnceAt` target whose kind contradicts the
    /// requested locality.
    pub fn new(recurrence: Recurrence, locality: Locality) -> Result<Self> {
        let recurrence = match recurrence {
            Recurrence::Weekly { days, at } => Recurrence::Weekly {
                days: days.require_non_empty()?,
                at,
            },
            Recurrence::Monthly { day, at } => Recurrence::Monthly {
                day: day.validate()?,
                at,
            },
            Recurrence::MultipleTimesPerDay { times } => Recurrence::MultipleTimesPerDay {
                times: sorted_unique_times(times)?,
            },
            Recurrence::FixedInterval { interval } => Recurrence::FixedInterval {
                interval: require_positive(interval, "interval")?,
            },
            Recurrence::AfterFixedDuration { duration } => Recurrence::AfterFixedDuration {
                duration: require_positive(duration, "duration")?,
            },
            Recurrence::OnceAt { target } => {
                match (target, locality) {
                    (OnceTarget::Absolute(_), Locality::Global)
                    | (OnceTarget::Local(_), Locality::Local(_)) => {}
                    (OnceTarget::Absolute(_), Locality::Local(_)) => {
                        return Err(ResetError::InvalidConfiguration(
                            "an absolute OnceAt target makes the rule global".to_string(),
                        ))
                    }
                    (OnceTarget::Local(_), Locality::Global) => {
                        return Err(ResetError::InvalidConfiguration(
                            "a local OnceAt target needs a local DST policy".to_string(),
                        ))
                    }
                }
                Recurrence::OnceAt { target }
            }
            daily @ Recurrence::Daily { .. } => daily,
        };
        Ok(Self {
            recurrence,
            locality,
        })
    }

    pub fn daily(at: WallTime) -> Self {
        Self {
            recurrence: Recurrence::Daily { at },
            locality: Locality::Global,
        }
    }

    pub fn weekly(days: DayOfWeekSet, at: WallTime) -> Result<Self> {
        Self::new(Recurrence::Weekly { days, at }, Locality::Global)
    }

    pub fn monthly(day: DayOfMonth, at: WallTime) -> Result<Self> {
        Self::new(Recurrence::Monthly { day, at }, Locality::Global)
    }

    pub fn multiple_times_per_day(times: impl IntoIterator<Item = WallTime>) -> Result<Self> {
        Self::new(
            Recurrence::MultipleTimesPerDay {
                times: times.into_iter().collect(),
            },
            Locality::Global,
        )
    }

    pub fn fixed_interval(interval: Duration) -> Result<Self> {
        Self::new(Recurrence::FixedInterval { interval }, Locality::Global)
    }

    pub fn after_fixed_duration(duration: Duration) -> Result<Self> {
        Self::new(Recurrence::AfterFixedDuration { duration }, Locality::Global)
    }

    pub fn once_at(target: DateTime<Utc>) -> Self {
        Self {
            recurrence: Recurrence::OnceAt {
                target: OnceTarget::Absolute(target),
            },
            locality: Locality::Global,
        }
    }

    pub fn once_at_local(target: NaiveDateTime, policy: DstPolicy) -> Self {
        Self {
            recurrence: Recurrence::OnceAt {
                target: OnceTarget::Local(target),
            },
            locality: Locality::Local(policy),
        }
    }

    /// Re-anchor a global rule on local wall-clock time.
    ///
    /// # Errors
    /// [`ResetError::InvalidConfiguration`] for `OnceAt`, whose locality is
    /// fixed by its target.
    pub fn local(self, policy: DstPolicy) -> Result<Self> {
        Self::new(self.recurrence, Locality::Local(policy))
    }

    pub fn recurrence(&self) -> &Recurrence {
        &self.recurrence
    }

    pub fn locality(&self) -> Locality {
        self.locality
    }

    pub fn is_local(&self) -> bool {
        matches!(self.locality, Locality::Local(_))
    }

    /// Next firing of a global rule strictly after `last`.
    ///
    /// # Errors
    /// [`ResetError::LocalityMismatch`] if the rule is local, or
    /// [`ResetError::SearchExhausted`] if no firing is found within the
    /// search horizon.
    pub fn next_firing(&self, last: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.next_firing_at(last, None)
    }

    /// Next firing of a local rule strictly after `last`, on `zone`'s wall clock.
    ///
    /// # Errors
    /// [`ResetError::LocalityMismatch`] if the rule is global; DST errors from
    /// [`resolve_local`] under `ThrowException`.
    pub fn next_firing_in(&self, last: DateTime<Utc>, zone: &Tz) -> Result<DateTime<Utc>> {
        self.next_firing_at(last, Some(zone))
    }

    /// The firing instant of a `OnceAt` rule, `None` for every other pattern.
    pub fn once_target(&self, zone: Option<&Tz>) -> Result<Option<DateTime<Utc>>> {
        let Recurrence::OnceAt { target } = self.recurrence else {
            return Ok(None);
        };
        match (target, self.locality, zone) {
            (OnceTarget::Absolute(at), Locality::Global, None) => Ok(Some(at)),
            (OnceTarget::Local(local), Locality::Local(policy), Some(zone)) => {
                resolve_local(local, zone, policy).map(Some)
            }
            _ => Err(ResetError::LocalityMismatch(
                "OnceAt target evaluated with the wrong locality".to_string(),
            )),
        }
    }

    pub(crate) fn next_firing_at(
        &self,
        last: DateTime<Utc>,
        zone: Option<&Tz>,
    ) -> Result<DateTime<Utc>> {
        match (self.locality, zone) {
            (Locality::Global, None) => self.evaluate(last, &Utc, DstPolicy::NextValid),
            (Locality::Local(policy), Some(zone)) => self.evaluate(last, zone, policy),
            (Locality::Global, Some(zone)) => Err(ResetError::LocalityMismatch(format!(
                "global rule evaluated with zone {}",
                zone.name()
            ))),
            (Locality::Local(_), None) => Err(ResetError::LocalityMismatch(
                "local rule evaluated without a zone".to_string(),
            )),
        }
    }

    fn evaluate<Z: Zone>(
        &self,
        last: DateTime<Utc>,
        zone: &Z,
        policy: DstPolicy,
    ) -> Result<DateTime<Utc>> {
        let search = Search {
            last,
            last_local: to_local(last, zone),
            zone,
            policy,
        };

        match &self.recurrence {
            Recurrence::Daily { at } => search.daily(std::slice::from_ref(at)),
            Recurrence::MultipleTimesPerDay { times } => search.daily(times),
            Recurrence::Weekly { days, at } => search.weekly(*days, *at),
            Recurrence::Monthly { day, at } => search.monthly(*day, *at),
            Recurrence::FixedInterval { interval } => checked_add(last, *interval),
            Recurrence::AfterFixedDuration { duration } => checked_add(last, *duration),
            Recurrence::OnceAt { target } => match target {
                OnceTarget::Absolute(at) => Ok(*at),
                OnceTarget::Local(local) => resolve_local(*local, zone, policy),
            },
        }
    }
}

/// One next-firing query: candidates are generated in ascending local order
/// and the first whose resolved instant is after `last` wins.
struct Search<'z, Z: Zone> {
    last: DateTime<Utc>,
    last_local: NaiveDateTime,
    zone: &'z Z,
    policy: DstPolicy,
}

impl<Z: Zone> Search<'_, Z> {
    fn first_after(
        &self,
        candidates: impl Iterator<Item = NaiveDateTime>,
        what: &str,
    ) -> Result<DateTime<Utc>> {
        for candidate in candidates {
            // Compare on the wall clock first so candidates that are already past
            // never reach the resolver (and never trip a reject policy).
            if candidate <= self.last_local {
                continue;
            }
            let resolved = resolve_local(candidate, self.zone, self.policy)?;
            if resolved > self.last {
                return Ok(resolved);
            }
            tracing::trace!(%candidate, %resolved, "candidate resolved before last firing");
        }
        tracing::warn!(last = %self.last, zone = %self.zone.zone_name(), what, "recurrence search exhausted");
        Err(ResetError::SearchExhausted(format!(
            "no {what} firing found after {}",
            self.last
        )))
    }

    /// `times` must be sorted. Today's times, then tomorrow's.
    fn daily(&self, times: &[WallTime]) -> Result<DateTime<Utc>> {
        let today = self.last_local.date();
        let candidates = today
            .iter_days()
            .take(2)
            .flat_map(|day| times.iter().map(move |t| t.on(day)));
        self.first_after(candidates, "daily")
    }

    fn weekly(&self, days: DayOfWeekSet, at: WallTime) -> Result<DateTime<Utc>> {
        let candidates = self
            .last_local
            .date()
            .iter_days()
            .take(WEEKLY_HORIZON_DAYS)
            .filter(|d| days.contains(d.weekday()))
            .map(|d| at.on(d));
        self.first_after(candidates, "weekly")
    }

    fn monthly(&self, day: DayOfMonth, at: WallTime) -> Result<DateTime<Utc>> {
        let start = self.last_local.date();
        let cursor = first_of_month(start.year(), start.month());
        let candidates = (0..MONTHLY_HORIZON_MONTHS).filter_map(|i| {
            let month = cursor?.checked_add_months(Months::new(i))?;
            let date = month.with_day(day.in_month(month.year(), month.month()))?;
            Some(at.on(date))
        });
        self.first_after(candidates, "monthly")
    }
}

fn checked_add(last: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>> {
    last.checked_add_signed(by)
        .ok_or_else(|| ResetError::InvalidInput(format!("{last} + {by} is out of range")))
}

fn require_positive(d: Duration, what: &str) -> Result<Duration> {
    if d <= Duration::zero() {
        return Err(ResetError::InvalidConfiguration(format!(
            "{what} must be positive, got {d}"
        )));
    }
    Ok(d)
}

fn sorted_unique_times(mut times: Vec<WallTime>) -> Result<Vec<WallTime>> {
    if times.is_empty() {
        return Err(ResetError::InvalidConfiguration(
            "at least one reset time must be specified".to_string(),
        ));
    }
    times.sort();
    if let Some(pair) = times.windows(2).find(|w| w[0] == w[1]) {
        return Err(ResetError::InvalidConfiguration(format!(
            "reset times must be unique, {} appears twice",
            pair[0]
        )));
    }
    Ok(times)
}
