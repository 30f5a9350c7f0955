//! # reset-engine
//!
//! Deterministic reset timers and activity windows with DST handling for game
//! servers.
//!
//! The engine answers two questions: when does a recurring reset (daily quest
//! refresh, weekly raid lockout, monthly pass rollover) fire next, and is a
//! scheduled event window (happy hour, weekend tournament) active right now.
//! Rules and schedules run either on the UTC calendar (global, the same
//! instant for every player) or on a player's local wall clock, where DST gaps
//! and overlaps are resolved by an explicit [`DstPolicy`].
//!
//! ## Modules
//!
//! - [`rule`]: recurrence patterns and next-firing evaluation
//! - [`timer`]: a rule bound to a clock and a latency buffer
//! - [`schedule`]: recurring and one-time activity windows
//! - [`window`]: window definitions and concrete windows
//! - [`snapshot`]: point-in-time schedule state
//! - [`dst`]: DST policies and local time resolution
//! - [`wall_time`], [`days`]: wall-clock times, weekday sets, day-of-month anchors
//! - [`instant`]: parsing UTC and local instants from text
//! - [`clock`]: injectable time sources
//! - [`config`]: serde records that build rules, timers and schedules
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use reset_engine::{RecurrenceRule, WallTime};
//!
//! let rule = RecurrenceRule::daily(WallTime::hm(4, 0).unwrap());
//! let last = Utc.with_ymd_and_hms(2026, 3, 15, 4, 0, 0).unwrap();
//! let next = rule.next_firing(last).unwrap();
//! assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 16, 4, 0, 0).unwrap());
//! ```

pub mod clock;
pub mod config;
pub mod days;
pub mod dst;
pub mod error;
pub mod instant;
pub mod rule;
pub mod schedule;
pub mod snapshot;
pub mod timer;
pub mod wall_time;
pub mod window;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{RuleConfig, ScheduleConfig, TimerConfig};
pub use days::{DayOfMonth, DayOfWeekSet};
pub use dst::{resolve_local, DstPolicy};
pub use error::{ResetError, Result};
pub use instant::{parse_local, parse_utc};
pub use rule::{Locality, OnceTarget, Recurrence, RecurrenceRule};
pub use schedule::{Schedule, Windows};
pub use snapshot::ScheduleSnapshot;
pub use timer::Timer;
pub use wall_time::WallTime;
pub use window::{AnchorKind, ScheduleWindow, WindowAnchor, WindowDefinition};
