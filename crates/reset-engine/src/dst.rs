//! DST transition policies and local wall-clock resolution.
//!
//! [`resolve_local`] is the single place where a local wall-clock datetime is
//! turned into an absolute instant. Every local rule and schedule goes through
//! it, so gap and overlap handling is identical everywhere.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ResetError, Result};

/// Forward DST shifts in the tz database never exceed this many minutes.
pub const MAX_GAP_MINUTES: i64 = 180;

/// Policy for local wall-clock times that fall inside a DST transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Gap: move to the first valid local time after the gap.
    /// Overlap: take the standard-offset (later) instant.
    #[default]
    NextValid,
    /// Gap: fail with `NonexistentLocalTime`. Overlap: fail with `AmbiguousLocalTime`.
    ThrowException,
}

/// A time zone the engine can evaluate rules in.
///
/// Implemented for `chrono_tz::Tz` (local rules) and `chrono::Utc` (global
/// rules, which never hit a gap or overlap).
pub trait Zone: TimeZone {
    fn zone_name(&self) -> String;
}

impl Zone for Tz {
    fn zone_name(&self) -> String {
        self.name().to_string()
    }
}

impl Zone for Utc {
    fn zone_name(&self) -> String {
        "UTC".to_string()
    }
}

/// Convert an absolute instant into local wall-clock time in `zone`.
pub fn to_local<Z: Zone>(instant: DateTime<Utc>, zone: &Z) -> NaiveDateTime {
    instant.with_timezone(zone).naive_local()
}

/// Resolve a local wall-clock datetime in `zone` to an absolute instant.
///
/// # Errors
/// - [`ResetError::NonexistentLocalTime`] for a gap under `ThrowException`.
/// - [`ResetError::AmbiguousLocalTime`] for an overlap under `ThrowException`.
/// - [`ResetError::SearchExhausted`] if no valid time exists within
///   [`MAX_GAP_MINUTES`] after a gap.
pub fn resolve_local<Z: Zone>(
    local: NaiveDateTime,
    zone: &Z,
    policy: DstPolicy,
) -> Result<DateTime<Utc>> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, latest) => match policy {
            DstPolicy::NextValid => {
                tracing::debug!(
                    %local,
                    zone = %zone.zone_name(),
                    earliest = %earliest.with_timezone(&Utc),
                    chosen = %latest.with_timezone(&Utc),
                    "ambiguous local time, taking standard offset"
                );
                Ok(latest.with_timezone(&Utc))
            }
            DstPolicy::ThrowException => Err(ResetError::AmbiguousLocalTime {
                local,
                zone: zone.zone_name(),
            }),
        },
        LocalResult::None => match policy {
            DstPolicy::NextValid => next_valid_after_gap(local, zone),
            DstPolicy::ThrowException => Err(ResetError::NonexistentLocalTime {
                local,
                zone: zone.zone_name(),
            }),
        },
    }
}

/// Step forward one minute at a time until the local time exists again.
fn next_valid_after_gap<Z: Zone>(local: NaiveDateTime, zone: &Z) -> Result<DateTime<Utc>> {
    for minutes in 1..=MAX_GAP_MINUTES {
        let Some(candidate) = local.checked_add_signed(Duration::minutes(minutes)) else {
            break;
        };
        let resolved = match zone.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => dt,
            // A gap immediately followed by an overlap: keep the standard reading.
            LocalResult::Ambiguous(_, latest) => latest,
            LocalResult::None => continue,
        };
        tracing::debug!(
            %local,
            shifted_to = %candidate,
            zone = %zone.zone_name(),
            "nonexistent local time, shifted past DST gap"
        );
        return Ok(resolved.with_timezone(&Utc));
    }

    tracing::warn!(%local, zone = %zone.zone_name(), "no valid local time after DST gap");
    Err(ResetError::SearchExhausted(format!(
        "no valid local time within {MAX_GAP_MINUTES} minutes after {local} in {}",
        zone.zone_name()
    )))
}
