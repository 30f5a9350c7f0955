//! Building rules, timers and schedules from JSON configuration.

use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};
use reset_engine::{
    DayOfMonth, DayOfWeekSet, DstPolicy, FixedClock, Locality, RecurrenceRule, ResetError,
    RuleConfig, ScheduleConfig, ScheduleWindow, TimerConfig, WallTime,
};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[test]
fn daily_rule_from_json() {
    let rule = RuleConfig::from_json(r#"{"kind": "daily", "at": "04:00"}"#)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(rule, RecurrenceRule::daily(WallTime::hm(4, 0).unwrap()));
}

#[test]
fn weekly_local_rule_from_json() {
    let config = RuleConfig::from_json(
        r#"{"kind": "weekly", "days": ["mon", "Thursday"], "at": "08:00:00", "dst": "throw_exception"}"#,
    )
    .unwrap();
    let rule = config.build().unwrap();
    assert_eq!(rule.locality(), Locality::Local(DstPolicy::ThrowException));

    let days: DayOfWeekSet = [Weekday::Mon, Weekday::Thu].into_iter().collect();
    let expected = RecurrenceRule::weekly(days, WallTime::hm(8, 0).unwrap())
        .unwrap()
        .local(DstPolicy::ThrowException)
        .unwrap();
    assert_eq!(rule, expected);
}

#[test]
fn monthly_rule_accepts_number_or_last() {
    let numbered = RuleConfig::from_json(r#"{"kind": "monthly", "day": 31, "at": "00:00"}"#).unwrap();
    let last = RuleConfig::from_json(r#"{"kind": "monthly", "day": "last", "at": "00:00"}"#).unwrap();
    assert_eq!(
        numbered,
        RuleConfig::Monthly {
            day: DayOfMonth::Day(31),
            at: WallTime::MIDNIGHT,
            dst: None,
        }
    );
    assert!(matches!(last, RuleConfig::Monthly { day: DayOfMonth::Last, .. }));
    assert!(RuleConfig::from_json(r#"{"kind": "monthly", "day": 0, "at": "00:00"}"#).is_err());
}

#[test]
fn multiple_times_rule_sorts_its_times() {
    let rule = RuleConfig::from_json(
        r#"{"kind": "multiple_times_per_day", "times": ["18:00", "06:00", "12:00"]}"#,
    )
    .unwrap()
    .build()
    .unwrap();
    assert_eq!(
        rule.next_firing(utc(2026, 3, 15, 7, 0)).unwrap(),
        utc(2026, 3, 15, 12, 0)
    );
}

#[test]
fn interval_rules_use_seconds() {
    let rule = RuleConfig::from_json(r#"{"kind": "fixed_interval", "interval_secs": 5400}"#)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        rule.next_firing(utc(2026, 3, 15, 0, 0)).unwrap(),
        utc(2026, 3, 15, 1, 30)
    );

    let err = RuleConfig::from_json(r#"{"kind": "after_fixed_duration", "duration_secs": 0}"#)
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, ResetError::InvalidConfiguration(_)));
}

#[test]
fn interval_rules_reject_a_dst_policy() {
    for json in [
        r#"{"kind": "fixed_interval", "interval_secs": 60, "dst": "next_valid"}"#,
        r#"{"kind": "after_fixed_duration", "duration_secs": 60, "dst": "throw_exception"}"#,
    ] {
        let built = RuleConfig::from_json(json).unwrap().build();
        assert!(matches!(built, Err(ResetError::InvalidConfiguration(_))), "{json}");
    }
    let plain = RuleConfig::from_json(r#"{"kind": "fixed_interval", "interval_secs": 60}"#)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(plain.locality(), Locality::Global);
}

#[test]
fn once_at_takes_exactly_one_target() {
    let absolute = RuleConfig::from_json(r#"{"kind": "once_at", "at_utc": "2026-06-01T12:00:00Z"}"#)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(absolute, RecurrenceRule::once_at(utc(2026, 6, 1, 12, 0)));

    let local = RuleConfig::from_json(r#"{"kind": "once_at", "at_local": "2026-06-01T05:00"}"#)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(local.locality(), Locality::Local(DstPolicy::NextValid));

    let neither = RuleConfig::from_json(r#"{"kind": "once_at"}"#).unwrap().build();
    assert!(matches!(neither, Err(ResetError::InvalidConfiguration(_))));

    let both = RuleConfig::from_json(
        r#"{"kind": "once_at", "at_utc": "2026-06-01T12:00:00Z", "at_local": "2026-06-01T05:00"}"#,
    )
    .unwrap()
    .build();
    assert!(matches!(both, Err(ResetError::InvalidConfiguration(_))));
}

#[test]
fn once_at_rejects_the_wrong_instant_kind() {
    let offset = RuleConfig::from_json(r#"{"kind": "once_at", "at_utc": "2026-06-01T12:00:00-07:00"}"#)
        .unwrap()
        .build();
    assert!(matches!(offset, Err(ResetError::WrongInstantKind(_))));

    let zoned_local = RuleConfig::from_json(r#"{"kind": "once_at", "at_local": "2026-06-01T05:00:00Z"}"#)
        .unwrap()
        .build();
    assert!(matches!(zoned_local, Err(ResetError::WrongInstantKind(_))));
}

#[test]
fn malformed_json_is_a_configuration_error() {
    assert!(matches!(
        RuleConfig::from_json(r#"{"kind": "hourly"}"#),
        Err(ResetError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        RuleConfig::from_json(r#"{"kind": "daily", "at": "25:00"}"#),
        Err(ResetError::InvalidConfiguration(_))
    ));
}

#[test]
fn rule_config_serializes_back() {
    let config = RuleConfig::Weekly {
        days: DayOfWeekSet::WEEKEND,
        at: WallTime::hm(10, 0).unwrap(),
        dst: Some(DstPolicy::NextValid),
    };
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "kind": "weekly",
            "days": ["Sun", "Sat"],
            "at": "10:00:00.000",
            "dst": "next_valid"
        })
    );
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[test]
fn timer_with_latency() {
    let config = TimerConfig::from_json(
        r#"{"rule": {"kind": "daily", "at": "00:00"}, "latency_ms": 500}"#,
    )
    .unwrap();
    let next = utc(2026, 3, 16, 0, 0);
    let timer = config
        .build_with_clock(FixedClock::new(next - Duration::milliseconds(400)))
        .unwrap();
    assert_eq!(timer.latency(), Duration::milliseconds(500));
    assert!(timer.should_fire(utc(2026, 3, 15, 0, 0)).unwrap());
}

#[test]
fn timer_defaults_and_rejects_negative_latency() {
    let timer = TimerConfig::from_json(r#"{"rule": {"kind": "daily", "at": "00:00"}}"#)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(timer.latency(), Duration::seconds(2));

    let err = TimerConfig::from_json(r#"{"rule": {"kind": "daily", "at": "00:00"}, "latency_ms": -1}"#)
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, ResetError::InvalidConfiguration(_)));

    let json = format!(r#"{{"rule": {{"kind": "daily", "at": "00:00"}}, "latency_ms": {}}}"#, i64::MIN);
    let err = TimerConfig::from_json(&json).unwrap().build().unwrap_err();
    assert!(matches!(err, ResetError::OutOfRange(_)));
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

#[test]
fn local_weekly_schedule_from_json() {
    let config = ScheduleConfig::from_json(
        r#"{
            "kind": "weekly",
            "timezone": "America/Los_Angeles",
            "windows": [{"days": ["sat", "sun"], "start": "10:00", "duration_secs": 43200}]
        }"#,
    )
    .unwrap();
    let schedule = config
        .build_with_clock(FixedClock::new(utc(2026, 3, 16, 0, 0)))
        .unwrap();
    assert_eq!(schedule.policy(), Some(DstPolicy::NextValid));
    // Saturday 2026-03-21 10:00 PDT.
    assert_eq!(
        schedule.next_window().unwrap(),
        Some(ScheduleWindow::new(utc(2026, 3, 21, 17, 0), utc(2026, 3, 22, 5, 0)).unwrap())
    );
}

#[test]
fn global_monthly_schedule_from_json() {
    let schedule = ScheduleConfig::from_json(
        r#"{
            "kind": "monthly",
            "windows": [
                {"day": 20, "start": "00:00", "duration_secs": 86400},
                {"day": 5, "start": "00:00", "duration_secs": 86400}
            ]
        }"#,
    )
    .unwrap()
    .build()
    .unwrap();
    assert_eq!(schedule.timezone(), None);
    assert_eq!(
        schedule.next_window_after(utc(2026, 4, 1, 0, 0)).unwrap(),
        Some(ScheduleWindow::new(utc(2026, 4, 5, 0, 0), utc(2026, 4, 6, 0, 0)).unwrap())
    );
}

#[test]
fn one_time_schedule_from_json() {
    let global = ScheduleConfig::from_json(
        r#"{"kind": "one_time", "start": "2026-07-04T00:00:00Z", "end": "2026-07-06T00:00:00Z"}"#,
    )
    .unwrap()
    .build()
    .unwrap();
    assert_eq!(
        global.current_window(utc(2026, 7, 5, 0, 0)).unwrap(),
        Some(ScheduleWindow::new(utc(2026, 7, 4, 0, 0), utc(2026, 7, 6, 0, 0)).unwrap())
    );

    let local = ScheduleConfig::from_json(
        r#"{"kind": "one_time", "timezone": "Asia/Tokyo", "start": "2026-07-04T09:00", "end": "2026-07-04T12:00"}"#,
    )
    .unwrap()
    .build()
    .unwrap();
    assert_eq!(
        local.current_window(utc(2026, 7, 4, 1, 0)).unwrap(),
        Some(ScheduleWindow::new(utc(2026, 7, 4, 0, 0), utc(2026, 7, 4, 3, 0)).unwrap())
    );
}

#[test]
fn schedule_config_errors() {
    let bad_zone = ScheduleConfig::from_json(
        r#"{"kind": "daily", "timezone": "Mars/Olympus", "windows": [{"start": "18:00", "duration_secs": 3600}]}"#,
    )
    .unwrap()
    .build();
    assert!(matches!(bad_zone, Err(ResetError::InvalidTimezone(_))));

    let dst_without_zone = ScheduleConfig::from_json(
        r#"{"kind": "daily", "dst": "next_valid", "windows": [{"start": "18:00", "duration_secs": 3600}]}"#,
    )
    .unwrap()
    .build();
    assert!(matches!(dst_without_zone, Err(ResetError::InvalidConfiguration(_))));

    let no_windows = ScheduleConfig::from_json(r#"{"kind": "daily", "windows": []}"#)
        .unwrap()
        .build();
    assert!(matches!(no_windows, Err(ResetError::InvalidConfiguration(_))));

    let backwards = ScheduleConfig::from_json(
        r#"{"kind": "one_time", "start": "2026-07-06T00:00:00Z", "end": "2026-07-04T00:00:00Z"}"#,
    )
    .unwrap()
    .build();
    assert!(matches!(backwards, Err(ResetError::InvalidConfiguration(_))));
}

#[test]
fn identical_configs_build_identical_schedules() {
    let json = r#"{"kind": "daily", "windows": [{"start": "18:00", "duration_secs": 7200}]}"#;
    let clock = FixedClock::new(utc(2026, 3, 15, 0, 0));
    let a = ScheduleConfig::from_json(json).unwrap().build_with_clock(clock.clone()).unwrap();
    let b = ScheduleConfig::from_json(json).unwrap().build_with_clock(clock).unwrap();
    let range = (utc(2026, 3, 1, 0, 0), utc(2026, 4, 1, 0, 0));
    let wa: Vec<_> = a.windows_in(range.0, range.1).unwrap().collect();
    let wb: Vec<_> = b.windows_in(range.0, range.1).unwrap().collect();
    assert_eq!(wa, wb);
    assert_eq!(wa.len(), 31);
}
