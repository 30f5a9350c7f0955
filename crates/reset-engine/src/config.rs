//! Declarative configuration for rules, timers and schedules.
//!
//! Game servers usually keep their reset calendar in data files. The records
//! here deserialize from JSON (or anything serde reads) and `build()` into the
//! validated engine types, so a bad file fails at load time with a
//! [`ResetError`] instead of at the first tick.
//!
//! ```json
//! { "kind": "weekly", "days": ["mon", "thu"], "at": "04:00", "dst": "next_valid" }
//! ```

use chrono::Duration;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::days::{DayOfMonth, DayOfWeekSet};
use crate::dst::DstPolicy;
use crate::error::{ResetError, Result};
use crate::instant::{parse_local, parse_utc};
use crate::rule::{Locality, OnceTarget, Recurrence, RecurrenceRule};
use crate::schedule::Schedule;
use crate::timer::Timer;
use crate::wall_time::WallTime;
use crate::window::WindowDefinition;

/// A recurrence rule. A present `dst` policy makes the rule local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    Daily {
        at: WallTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
    },
    Weekly {
        days: DayOfWeekSet,
        at: WallTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
    },
    Monthly {
        day: DayOfMonth,
        at: WallTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
    },
    MultipleTimesPerDay {
        times: Vec<WallTime>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
    },
    FixedInterval {
        interval_secs: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
    },
    AfterFixedDuration {
        duration_secs: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
    },
    /// Exactly one of `at_utc` (RFC 3339, zero offset) and `at_local` (naive ISO 8601).
    OnceAt {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at_utc: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at_local: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
    },
}

impl RuleConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        from_json(json)
    }

    pub fn build(&self) -> Result<RecurrenceRule> {
        let (recurrence, dst) = match self {
            Self::Daily { at, dst } => (Recurrence::Daily { at: *at }, *dst),
            Self::Weekly { days, at, dst } => (
                Recurrence::Weekly {
                    days: *days,
                    at: *at,
                },
                *dst,
            ),
            Self::Monthly { day, at, dst } => (Recurrence::Monthly { day: *day, at: *at }, *dst),
            Self::MultipleTimesPerDay { times, dst } => (
                Recurrence::MultipleTimesPerDay {
                    times: times.clone(),
                },
                *dst,
            ),
            Self::FixedInterval { interval_secs, dst } => {
                reject_interval_dst("fixed_interval", *dst)?;
                (
                    Recurrence::FixedInterval {
                        interval: seconds(*interval_secs)?,
                    },
                    None,
                )
            }
            Self::AfterFixedDuration { duration_secs, dst } => {
                reject_interval_dst("after_fixed_duration", *dst)?;
                (
                    Recurrence::AfterFixedDuration {
                        duration: seconds(*duration_secs)?,
                    },
                    None,
                )
            }
            Self::OnceAt {
                at_utc,
                at_local,
                dst,
            } => match (at_utc, at_local) {
                (Some(utc), None) => {
                    if dst.is_some() {
                        return Err(ResetError::InvalidConfiguration(
                            "once_at with at_utc cannot take a dst policy".to_string(),
                        ));
                    }
                    return Ok(RecurrenceRule::once_at(parse_utc(utc)?));
                }
                (None, Some(local)) => {
                    let target = OnceTarget::Local(parse_local(local)?);
                    (Recurrence::OnceAt { target }, Some(dst.unwrap_or_default()))
                }
                _ => {
                    return Err(ResetError::InvalidConfiguration(
                        "once_at needs exactly one of at_utc and at_local".to_string(),
                    ))
                }
            },
        };
        let locality = dst.map_or(Locality::Global, Locality::Local);
        RecurrenceRule::new(recurrence, locality)
    }
}

/// A timer: a rule plus an optional latency buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimerConfig {
    pub rule: RuleConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
}

impl TimerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        from_json(json)
    }

    /// Build a timer on the system clock.
    pub fn build(&self) -> Result<Timer<SystemClock>> {
        self.build_with_clock(SystemClock)
    }

    pub fn build_with_clock<C: Clock>(&self, clock: C) -> Result<Timer<C>> {
        let timer = Timer::with_clock(self.rule.build()?, clock);
        match self.latency_ms {
            Some(ms) => {
                let latency = Duration::try_milliseconds(ms).ok_or_else(|| {
                    ResetError::OutOfRange(format!("latency of {ms} ms is out of range"))
                })?;
                timer.with_latency(latency)
            }
            None => Ok(timer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyWindowConfig {
    pub start: WallTime,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeeklyWindowConfig {
    pub days: DayOfWeekSet,
    pub start: WallTime,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyWindowConfig {
    pub day: DayOfMonth,
    pub start: WallTime,
    pub duration_secs: i64,
}

/// A schedule. With `timezone` set it runs on that zone's wall clock; `dst`
/// defaults to `next_valid` and is only meaningful together with `timezone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleConfig {
    Daily {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
        windows: Vec<DailyWindowConfig>,
    },
    Weekly {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
        windows: Vec<WeeklyWindowConfig>,
    },
    Monthly {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
        windows: Vec<MonthlyWindowConfig>,
    },
    /// `start`/`end` are RFC 3339 UTC without `timezone`, naive local with it.
    OneTime {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<DstPolicy>,
        start: String,
        end: String,
    },
}

impl ScheduleConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        from_json(json)
    }

    /// Build a schedule on the system clock.
    pub fn build(&self) -> Result<Schedule<SystemClock>> {
        self.build_with_clock(SystemClock)
    }

    pub fn build_with_clock<C: Clock>(&self, clock: C) -> Result<Schedule<C>> {
        let (timezone, dst, definitions) = match self {
            Self::Daily {
                timezone,
                dst,
                windows,
            } => {
                let defs = windows
                    .iter()
                    .map(|w| WindowDefinition::daily(w.start, seconds(w.duration_secs)?))
                    .collect::<Result<Vec<_>>>()?;
                (timezone, dst, defs)
            }
            Self::Weekly {
                timezone,
                dst,
                windows,
            } => {
                let defs = windows
                    .iter()
                    .map(|w| WindowDefinition::weekly(w.days, w.start, seconds(w.duration_secs)?))
                    .collect::<Result<Vec<_>>>()?;
                (timezone, dst, defs)
            }
            Self::Monthly {
                timezone,
                dst,
                windows,
            } => {
                let defs = windows
                    .iter()
                    .map(|w| WindowDefinition::monthly(w.day, w.start, seconds(w.duration_secs)?))
                    .collect::<Result<Vec<_>>>()?;
                (timezone, dst, defs)
            }
            Self::OneTime {
                timezone,
                dst,
                start,
                end,
            } => {
                return match zone_and_policy(timezone.as_deref(), *dst)? {
                    Some((tz, policy)) => {
                        Schedule::one_time_local(parse_local(start)?, parse_local(end)?, tz, policy, clock)
                    }
                    None => Schedule::one_time(parse_utc(start)?, parse_utc(end)?, clock),
                };
            }
        };
        match zone_and_policy(timezone.as_deref(), *dst)? {
            Some((tz, policy)) => Schedule::local(definitions, tz, policy, clock),
            None => Schedule::global(definitions, clock),
        }
    }
}

/// Parse an IANA zone name such as `"America/Los_Angeles"`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ResetError::InvalidTimezone(format!("unknown timezone '{name}'")))
}

fn zone_and_policy(timezone: Option<&str>, dst: Option<DstPolicy>) -> Result<Option<(Tz, DstPolicy)>> {
    match (timezone, dst) {
        (Some(name), dst) => Ok(Some((parse_timezone(name)?, dst.unwrap_or_default()))),
        (None, Some(_)) => Err(ResetError::InvalidConfiguration(
            "a dst policy requires a timezone".to_string(),
        )),
        (None, None) => Ok(None),
    }
}

/// Interval rules add an absolute duration, so a DST policy has nothing to govern.
fn reject_interval_dst(kind: &str, dst: Option<DstPolicy>) -> Result<()> {
    match dst {
        Some(_) => Err(ResetError::InvalidConfiguration(format!(
            "{kind} cannot take a dst policy"
        ))),
        None => Ok(()),
    }
}

fn seconds(secs: i64) -> Result<Duration> {
    Duration::try_seconds(secs)
        .ok_or_else(|| ResetError::OutOfRange(format!("{secs} seconds is out of range")))
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| ResetError::InvalidConfiguration(e.to_string()))
}
