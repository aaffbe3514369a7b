// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn schedule() -> Schedule {
    Schedule {
        id: ScheduleId::from_string("sch-1"),
        robot_id: RobotId::from_string("rbt-1"),
        enabled: true,
        cron_expr: "* * * * *".to_string(),
        timezone: "UTC".to_string(),
        window_start: None,
        window_end: None,
        max_concurrency: 1,
        timeout_seconds: 3600,
        retry_count: 0,
        retry_backoff_seconds: 60,
        created_at_ms: 0,
    }
}

#[test]
fn valid_schedule_passes() {
    schedule().validate().unwrap();
}

#[test]
fn bad_cron_is_rejected() {
    let mut s = schedule();
    s.cron_expr = "* * *".to_string();
    assert!(matches!(s.validate(), Err(DomainError::InvalidCron(_))));
}

#[test]
fn lone_window_bound_is_rejected() {
    let mut s = schedule();
    s.window_start = Some("08:00".to_string());
    assert!(matches!(s.validate(), Err(DomainError::InvalidWindow(_))));
}

#[test]
fn malformed_window_time_is_rejected() {
    let mut s = schedule();
    s.window_start = Some("08:00".to_string());
    s.window_end = Some("25:99".to_string());
    assert!(matches!(s.validate(), Err(DomainError::InvalidWindow(_))));
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut s = schedule();
    s.max_concurrency = 0;
    assert!(s.validate().is_err());
}

#[yare::parameterized(
    inside = { "08:00", "18:00", 9 * 60, true },
    at_start = { "08:00", "18:00", 8 * 60, true },
    at_end = { "08:00", "18:00", 18 * 60, true },
    before = { "08:00", "18:00", 7 * 60 + 59, false },
    after = { "08:00", "18:00", 18 * 60 + 1, false },
    wrapped_evening = { "22:00", "06:00", 23 * 60, true },
    wrapped_morning = { "22:00", "06:00", 5 * 60, true },
    wrapped_midday = { "22:00", "06:00", 12 * 60, false },
)]
fn execution_window(start: &str, end: &str, local_minutes: u32, inside: bool) {
    let mut s = schedule();
    s.window_start = Some(start.to_string());
    s.window_end = Some(end.to_string());
    assert_eq!(s.window_contains(local_minutes).unwrap(), inside);
}

#[test]
fn no_window_is_always_inside() {
    assert!(schedule().window_contains(0).unwrap());
    assert!(schedule().window_contains(23 * 60 + 59).unwrap());
}

#[yare::parameterized(
    midnight = { "00:00", 0 },
    morning = { "08:30", 510 },
    last_minute = { "23:59", 1439 },
)]
fn hhmm_parses(input: &str, minutes: u32) {
    assert_eq!(parse_hhmm(input).unwrap(), minutes);
}

#[yare::parameterized(
    no_colon = { "0800" },
    hour_too_big = { "24:00" },
    minute_too_big = { "10:60" },
    alpha = { "ab:cd" },
)]
fn hhmm_rejects(input: &str) {
    assert!(parse_hhmm(input).is_err());
}
