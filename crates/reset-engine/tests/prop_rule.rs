//! Property-based tests for recurrence rules and timer predicates.
//!
//! These hold for any valid rule and any last-fired instant, not just the
//! calendar cases in `rule_tests.rs` and `dst_tests.rs`.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use reset_engine::timer::{should_fire, time_until_firing};
use reset_engine::{DayOfMonth, DayOfWeekSet, DstPolicy, RecurrenceRule, WallTime};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_wall_time() -> impl Strategy<Value = WallTime> {
    (0u32..24, 0u32..60, 0u32..60).prop_map(|(h, m, s)| WallTime::hms(h, m, s).unwrap())
}

fn arb_days() -> impl Strategy<Value = DayOfWeekSet> {
    (1u8..=0x7f).prop_map(|bits| DayOfWeekSet::from_bits(bits).unwrap())
}

fn arb_day_of_month() -> impl Strategy<Value = DayOfMonth> {
    prop_oneof![
        (1u32..=31).prop_map(|d| DayOfMonth::day(d).unwrap()),
        Just(DayOfMonth::Last),
    ]
}

/// A calendar rule and the longest possible gap between two of its firings.
fn arb_calendar_rule() -> impl Strategy<Value = (RecurrenceRule, Duration)> {
    prop_oneof![
        arb_wall_time().prop_map(|t| (RecurrenceRule::daily(t), Duration::days(1))),
        (arb_days(), arb_wall_time())
            .prop_map(|(d, t)| (RecurrenceRule::weekly(d, t).unwrap(), Duration::days(7))),
        (arb_day_of_month(), arb_wall_time())
            .prop_map(|(d, t)| (RecurrenceRule::monthly(d, t).unwrap(), Duration::days(31))),
        proptest::collection::vec(arb_wall_time(), 1..6).prop_map(|mut times| {
            times.sort();
            times.dedup();
            (
                RecurrenceRule::multiple_times_per_day(times).unwrap(),
                Duration::days(1),
            )
        }),
    ]
}

fn arb_timezone() -> impl Strategy<Value = Tz> {
    prop_oneof![
        Just(chrono_tz::America::Los_Angeles),
        Just(chrono_tz::America::New_York),
        Just(chrono_tz::Europe::Berlin),
        Just(chrono_tz::Europe::London),
        Just(chrono_tz::Asia::Tokyo),
        Just(chrono_tz::Australia::Sydney),
    ]
}

/// An instant between 2024 and 2028, millisecond precision.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (1_704_067_200_000i64..1_830_297_600_000)
        .prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap())
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: next firing is strictly after last (global)
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn global_next_firing_is_after_last(
        (rule, max_gap) in arb_calendar_rule(),
        last in arb_instant(),
    ) {
        let next = rule.next_firing(last).unwrap();
        prop_assert!(next > last, "{next} is not after {last}");
        prop_assert!(next - last <= max_gap, "gap {} exceeds {}", next - last, max_gap);
    }
}

// ---------------------------------------------------------------------------
// Property 2: next firing is strictly after last (local, resolve-forward)
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn local_next_firing_is_after_last(
        (rule, max_gap) in arb_calendar_rule(),
        tz in arb_timezone(),
        last in arb_instant(),
    ) {
        let rule = rule.local(DstPolicy::NextValid).unwrap();
        let next = rule.next_firing_in(last, &tz).unwrap();
        prop_assert!(next > last, "{next} is not after {last} in {}", tz.name());
        // A DST shift can stretch one gap by at most an hour.
        prop_assert!(next - last <= max_gap + Duration::hours(1));
    }
}

// ---------------------------------------------------------------------------
// Property 3: chained firings strictly increase
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn chained_firings_strictly_increase(
        (rule, _) in arb_calendar_rule(),
        tz in arb_timezone(),
        start in arb_instant(),
    ) {
        let rule = rule.local(DstPolicy::NextValid).unwrap();
        let mut last = start;
        for _ in 0..12 {
            let next = rule.next_firing_in(last, &tz).unwrap();
            prop_assert!(next > last);
            last = next;
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: interval rules add exactly their duration
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn interval_adds_exact_duration(
        secs in 1i64..=7 * 86_400,
        last in arb_instant(),
    ) {
        let interval = Duration::seconds(secs);
        let rule = RecurrenceRule::fixed_interval(interval).unwrap();
        prop_assert_eq!(rule.next_firing(last).unwrap(), last + interval);
        let once = RecurrenceRule::after_fixed_duration(interval).unwrap();
        prop_assert_eq!(once.next_firing(last).unwrap(), last + interval);
    }
}

// ---------------------------------------------------------------------------
// Property 5: should_fire flips exactly at next - latency
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn should_fire_boundary(
        next in arb_instant(),
        latency_ms in 0i64..=10_000,
    ) {
        let latency = Duration::milliseconds(latency_ms);
        prop_assert!(!should_fire(next, next - latency - Duration::milliseconds(1), latency));
        prop_assert!(!should_fire(next, next - latency, latency));
        prop_assert!(should_fire(next, next - latency + Duration::milliseconds(1), latency));
        prop_assert!(should_fire(next, next + Duration::milliseconds(1), latency));
    }
}

// ---------------------------------------------------------------------------
// Property 6: time until firing is never negative
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn time_until_is_non_negative(next in arb_instant(), now in arb_instant()) {
        let left = time_until_firing(next, now);
        prop_assert!(left >= Duration::zero());
        if now <= next {
            prop_assert_eq!(left, next - now);
        }
    }
}
