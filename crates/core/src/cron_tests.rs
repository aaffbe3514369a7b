// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn matches_minute(expr: &str, minute: u32) -> bool {
    CronExpr::parse(&format!("{expr} * * * *"))
        .unwrap()
        .matches(minute, 0, 1, 1, 0)
}

#[test]
fn wildcard_matches_everything() {
    let cron = CronExpr::parse("* * * * *").unwrap();
    assert!(cron.matches(0, 0, 1, 1, 0));
    assert!(cron.matches(59, 23, 31, 12, 6));
}

#[yare::parameterized(
    exact_hit = { "30", 30, true },
    exact_miss = { "30", 31, false },
    list_hit = { "5,10,15", 10, true },
    list_miss = { "5,10,15", 11, false },
    range_low = { "10-20", 10, true },
    range_high = { "10-20", 20, true },
    range_outside = { "10-20", 21, false },
    range_step_hit = { "10-20/5", 15, true },
    range_step_miss = { "10-20/5", 11, false },
    star_step_zero = { "*/15", 0, true },
    star_step_hit = { "*/15", 45, true },
    star_step_miss = { "*/15", 40, false },
    value_with_step_hit = { "5/2", 5, true },
    value_with_step_miss = { "5/2", 7, false },
    reversed_range_never = { "20-10", 15, false },
)]
fn minute_atoms(expr: &str, minute: u32, expected: bool) {
    assert_eq!(matches_minute(expr, minute), expected);
}

#[test]
fn hour_step_counts_from_field_minimum() {
    let cron = CronExpr::parse("0 */6 * * *").unwrap();
    for hour in 0..24 {
        assert_eq!(cron.matches(0, hour, 1, 1, 0), hour % 6 == 0, "hour {hour}");
    }
}

#[test]
fn day_of_week_seven_is_sunday() {
    let cron = CronExpr::parse("* * * * 7").unwrap();
    assert!(cron.matches(0, 0, 1, 1, 0));
    assert!(cron.matches(0, 0, 1, 1, 7));
    assert!(!cron.matches(0, 0, 1, 1, 1));
}

#[test]
fn day_of_week_range_with_seven_endpoint() {
    // 5-7 normalizes to 5-0, which is reversed and never matches.
    let cron = CronExpr::parse("* * * * 5-7").unwrap();
    for dow in 0..7 {
        assert!(!cron.matches(0, 0, 1, 1, dow), "dow {dow}");
    }
}

#[test]
fn weekday_range_matches_business_days() {
    let cron = CronExpr::parse("* * * * 1-5").unwrap();
    assert!(!cron.matches(0, 0, 1, 1, 0));
    assert!(cron.matches(0, 0, 1, 1, 3));
    assert!(!cron.matches(0, 0, 1, 1, 6));
}

#[yare::parameterized(
    four_fields = { "* * * *" },
    six_fields = { "* * * * * *" },
    bare_step = { "/5 * * * *" },
    zero_step = { "*/0 * * * *" },
    alpha = { "a * * * *" },
    empty_list_atom = { "1,,2 * * * *" },
    minute_out_of_range = { "60 * * * *" },
    month_out_of_range = { "* * * 13 *" },
    dow_out_of_range = { "* * * * 8" },
    negative = { "-5 * * * *" },
)]
fn invalid_expressions(expr: &str) {
    assert!(CronExpr::parse(expr).is_err(), "{expr:?} should not parse");
}

proptest! {
    /// An exact minute atom matches that minute and nothing else.
    #[test]
    fn exact_atom_denotes_singleton(atom in 0u32..60, probe in 0u32..60) {
        prop_assert_eq!(matches_minute(&atom.to_string(), probe), atom == probe);
    }

    /// A stepped range atom matches exactly the stepped values inside it.
    #[test]
    fn range_atom_denotes_stepped_interval(
        start in 0u32..60,
        end in 0u32..60,
        step in 1u32..10,
        probe in 0u32..60,
    ) {
        let expr = format!("{start}-{end}/{step}");
        let expected = start <= probe && probe <= end && (probe - start) % step == 0;
        prop_assert_eq!(matches_minute(&expr, probe), expected);
    }
}
