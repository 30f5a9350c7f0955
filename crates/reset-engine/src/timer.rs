//! Timers: a recurrence rule bound to a clock and a latency buffer.
//!
//! Callers poll a timer from their tick loop with the instant they last
//! observed a firing. The latency buffer lets a poll that lands shortly before
//! the firing instant report it, so a firing between two ticks is not missed.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::clock::{Clock, SystemClock};
use crate::error::{ResetError, Result};
use crate::rule::{Recurrence, RecurrenceRule};

/// Latency applied when none is configured, in milliseconds.
pub const DEFAULT_LATENCY_MS: i64 = 2_000;

/// True once `now` is within `latency` of `next`, or past it. A latency
/// reaching past the start of representable time always fires.
pub fn should_fire(next: DateTime<Utc>, now: DateTime<Utc>, latency: Duration) -> bool {
    next.checked_sub_signed(latency)
        .map_or(true, |threshold| now > threshold)
}

/// Time left until `next`, clamped to zero.
pub fn time_until_firing(next: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (next - now).max(Duration::zero())
}

/// A recurrence rule evaluated against an injected clock.
#[derive(Debug, Clone)]
pub struct Timer<C = SystemClock> {
    rule: RecurrenceRule,
    latency: Duration,
    clock: C,
}

impl Timer<SystemClock> {
    /// A timer on the system clock with the default two-second latency.
    pub fn new(rule: RecurrenceRule) -> Self {
        Self::with_clock(rule, SystemClock)
    }
}

impl<C: Clock> Timer<C> {
    pub fn with_clock(rule: RecurrenceRule, clock: C) -> Self {
        Self {
            rule,
            latency: Duration::milliseconds(DEFAULT_LATENCY_MS),
            clock,
        }
    }

    /// Replace the latency buffer at construction.
    pub fn with_latency(mut self, latency: Duration) -> Result<Self> {
        self.set_latency(latency)?;
        Ok(self)
    }

    /// # Errors
    /// [`ResetError::InvalidConfiguration`] if `latency` is negative.
    pub fn set_latency(&mut self, latency: Duration) -> Result<()> {
        if latency < Duration::zero() {
            return Err(ResetError::InvalidConfiguration(format!(
                "latency must be non-negative, got {latency}"
            )));
        }
        self.latency = latency;
        Ok(())
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Next firing of a global timer strictly after `last`.
    pub fn next_firing(&self, last: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.rule.next_firing(last)
    }

    /// Next firing of a local timer strictly after `last`.
    pub fn next_firing_in(&self, last: DateTime<Utc>, zone: &Tz) -> Result<DateTime<Utc>> {
        self.rule.next_firing_in(last, zone)
    }

    /// Whether a global timer should fire now, given its last firing.
    pub fn should_fire(&self, last: DateTime<Utc>) -> Result<bool> {
        self.should_fire_at(last, None)
    }

    /// Whether a local timer should fire now in `zone`, given its last firing.
    pub fn should_fire_in(&self, last: DateTime<Utc>, zone: &Tz) -> Result<bool> {
        self.should_fire_at(last, Some(zone))
    }

    /// Time left until a global timer next fires, clamped to zero.
    pub fn time_until_firing(&self, last: DateTime<Utc>) -> Result<Duration> {
        self.time_until_at(last, None)
    }

    /// Time left until a local timer next fires in `zone`, clamped to zero.
    pub fn time_until_firing_in(&self, last: DateTime<Utc>, zone: &Tz) -> Result<Duration> {
        self.time_until_at(last, Some(zone))
    }

    /// Next firing after the clock's current instant (global timers).
    pub fn next_upcoming_firing(&self) -> Result<DateTime<Utc>> {
        self.next_firing(self.clock.now())
    }

    /// Time until the next firing after the clock's current instant (global timers).
    pub fn time_until_upcoming_firing(&self) -> Result<Duration> {
        self.time_until_firing(self.clock.now())
    }

    /// Next firing after the clock's current instant (local timers).
    pub fn next_upcoming_firing_in(&self, zone: &Tz) -> Result<DateTime<Utc>> {
        self.next_firing_in(self.clock.now(), zone)
    }

    /// Time until the next firing after the clock's current instant (local timers).
    pub fn time_until_upcoming_firing_in(&self, zone: &Tz) -> Result<Duration> {
        self.time_until_firing_in(self.clock.now(), zone)
    }

    /// Whether a `OnceAt` timer has already fired at or before `last`.
    /// Always `false` for recurring patterns.
    pub fn has_fired(&self, last: DateTime<Utc>, zone: Option<&Tz>) -> Result<bool> {
        Ok(self
            .rule
            .once_target(zone)?
            .is_some_and(|target| last >= target))
    }

    fn should_fire_at(&self, last: DateTime<Utc>, zone: Option<&Tz>) -> Result<bool> {
        let next = self.rule.next_firing_at(last, zone)?;
        if self.is_once() && last >= next {
            return Ok(false);
        }
        Ok(should_fire(next, self.clock.now(), self.latency))
    }

    fn time_until_at(&self, last: DateTime<Utc>, zone: Option<&Tz>) -> Result<Duration> {
        let next = self.rule.next_firing_at(last, zone)?;
        if self.is_once() && last >= next {
            return Ok(Duration::zero());
        }
        Ok(time_until_firing(next, self.clock.now()))
    }

    fn is_once(&self) -> bool {
        matches!(self.rule.recurrence(), Recurrence::OnceAt { .. })
    }
}
