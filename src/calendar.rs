//! Calendar arithmetic for task scheduling.
//!
//! All scheduling maths works on naive local instants: a task start sits at
//! 00:00:00.000 of its day, a task end at 23:59:59.999 of its day, and a
//! duration is an inclusive day count (a task starting and ending on the same
//! day has duration 1).

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};

/// Normalize an instant to 00:00:00.000 of its nearest calendar day.
///
/// The half-day offset makes instants close to a day boundary resolve to the
/// intuitively nearest day, so a start that drifted a few hours off midnight
/// still lands on the intended day.
pub fn start_of_day(t: NaiveDateTime) -> NaiveDateTime {
    let shifted = t + Duration::hours(12);
    day_start(shifted.date())
}

/// Normalize an instant to 23:59:59.999 of its nearest calendar day.
/// Complementary half-day offset to `start_of_day`.
pub fn end_of_day(t: NaiveDateTime) -> NaiveDateTime {
    let shifted = t - Duration::hours(12);
    day_end(shifted.date())
}

/// 00:00:00.000 of the given day.
pub fn day_start(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(0, 0, 0).unwrap()
}

/// 23:59:59.999 of the given day.
pub fn day_end(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_milli_opt(23, 59, 59, 999).unwrap()
}

/// Inclusive day count between two instants, ignoring time of day.
/// Same day returns 1. Symmetric under swapping the arguments.
pub fn inclusive_day_span(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    distance_in_days(a, b) + 1
}

/// Whole-day distance between two instants, ignoring time of day.
/// Same day returns 0. Symmetric under swapping the arguments.
pub fn distance_in_days(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    b.date()
        .signed_duration_since(a.date())
        .num_days()
        .abs()
}

/// Shift an instant by a number of calendar days, keeping its time of day.
/// `None` when the shift leaves the representable date range.
pub fn shift_by_days(t: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    Duration::try_days(days).and_then(|d| t.checked_add_signed(d))
}

/// End instant of a task given its start and inclusive duration.
///
/// A duration-1 task starting on day D ends at 23:59:59.999 of day D, so the
/// shift is `duration - 1` days. The landing day is pinned to its last
/// millisecond before the end-of-day normalisation, which is then an
/// identity. `None` when the span runs off the calendar.
pub fn end_from_start_and_duration(start: NaiveDateTime, duration: i64) -> Option<NaiveDateTime> {
    let landed = shift_by_days(start, duration - 1)?;
    Some(end_of_day(day_end(landed.date())))
}

/// Start instant of a task given its end and inclusive duration.
/// Mirror of `end_from_start_and_duration`.
pub fn start_from_end_and_duration(end: NaiveDateTime, duration: i64) -> Option<NaiveDateTime> {
    let landed = shift_by_days(end, -(duration - 1))?;
    Some(start_of_day(day_start(landed.date())))
}

/// Parse free-form duration text into a positive inclusive day count.
///
/// Accepts a bare integer ("5") or whitespace-separated unit terms with `d`
/// (days) and `w` (weeks, 7 days) suffixes: "1w 3d" is 10. Unparseable or
/// non-positive input clamps to 1; this never fails.
pub fn parse_duration_days(s: &str) -> u32 {
    parse_duration_terms(s).filter(|&n| n >= 1).unwrap_or(1)
}

fn parse_duration_terms(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return u32::try_from(n).ok();
    }
    let mut total: i64 = 0;
    for term in s.split_whitespace() {
        let (number, unit_days) = if let Some(n) = term.strip_suffix(['d', 'D']) {
            (n, 1)
        } else if let Some(n) = term.strip_suffix(['w', 'W']) {
            (n, 7)
        } else {
            return None;
        };
        let n: i64 = number.trim().parse().ok()?;
        total += n * unit_days;
    }
    u32::try_from(total).ok()
}

/// Render an inclusive day count back to duration field text.
pub fn format_duration_days(n: u32) -> String {
    n.to_string()
}

/// Parse human-readable date input with smart natural language support.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "next monday", "this friday", bare weekday names
/// - "end of week", "end of month", "this weekend"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD" format
pub fn parse_date_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_this_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            // Last day of current month
            let year = today.year();
            let month = today.month();
            let next_month = if month == 12 { 1 } else { month + 1 };
            let next_year = if month == 12 { year + 1 } else { year };
            let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        "this weekend" | "weekend" => {
            // Coming Saturday
            let days_until_saturday = (6 - today.weekday().num_days_from_monday()) % 7;
            return Some(today + Duration::days(days_until_saturday as i64));
        }
        _ => {}
    }

    // "in X" patterns; out-of-range magnitudes are unparseable, not a panic.
    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Duration::try_days(days).and_then(|d| today.checked_add_signed(d));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Duration::try_weeks(weeks).and_then(|d| today.checked_add_signed(d));
            }
        }
        if let Some(nm) = rest.strip_suffix('m') {
            if let Ok(months) = nm.trim().parse::<i64>() {
                // Approximate: 30 days per month
                return months
                    .checked_mul(30)
                    .and_then(Duration::try_days)
                    .and_then(|d| today.checked_add_signed(d));
            }
        }
    }

    // Weekday patterns
    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];

    for (day_name, target_day) in weekdays {
        let current_day = today.weekday().num_days_from_monday() as i32;
        let days_ahead = ((target_day + 7 - current_day) % 7) as i64;

        if s == day_name || s == format!("this {}", day_name) {
            // This week's occurrence
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {}", day_name) {
            // Next week's occurrence
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add));
        }
    }

    // Try ISO format
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    // ISO week: Monday start.
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_start_of_day_snaps_to_nearest_day() {
        let base = d(2024, 1, 10);
        assert_eq!(start_of_day(day_start(base)), day_start(base));
        assert_eq!(start_of_day(base.and_hms_opt(9, 30, 0).unwrap()), day_start(base));
        // Within half a day of the next boundary it rounds forward.
        let late = base.and_hms_milli_opt(23, 59, 59, 999).unwrap();
        assert_eq!(start_of_day(late), day_start(d(2024, 1, 11)));
    }

    #[test]
    fn test_end_of_day_snaps_to_nearest_day() {
        let base = d(2024, 1, 10);
        assert_eq!(end_of_day(day_end(base)), day_end(base));
        assert_eq!(end_of_day(base.and_hms_opt(14, 0, 0).unwrap()), day_end(base));
        // Within half a day of the previous boundary it rounds back.
        assert_eq!(end_of_day(day_start(base)), day_end(d(2024, 1, 9)));
    }

    #[test]
    fn test_inclusive_span_same_day_is_one() {
        let t = day_start(d(2024, 3, 1));
        assert_eq!(inclusive_day_span(t, day_end(d(2024, 3, 1))), 1);
    }

    #[test]
    fn test_inclusive_span_is_distance_plus_one() {
        let a = day_start(d(2024, 1, 10));
        for offset in 0..40 {
            let b = day_end(d(2024, 1, 10) + Duration::days(offset));
            assert_eq!(inclusive_day_span(a, b), distance_in_days(a, b) + 1);
        }
    }

    #[test]
    fn test_span_and_distance_are_symmetric() {
        let a = day_start(d(2024, 1, 10));
        let b = day_end(d(2024, 2, 2));
        assert_eq!(inclusive_day_span(a, b), inclusive_day_span(b, a));
        assert_eq!(distance_in_days(a, b), distance_in_days(b, a));
    }

    #[test]
    fn test_span_crosses_leap_day() {
        let a = day_start(d(2024, 2, 28));
        let b = day_end(d(2024, 3, 1));
        // 28th, 29th, 1st
        assert_eq!(inclusive_day_span(a, b), 3);
    }

    #[test]
    fn test_end_from_start_and_duration() {
        let start = day_start(d(2024, 1, 10));
        assert_eq!(end_from_start_and_duration(start, 5), Some(day_end(d(2024, 1, 14))));
        // Duration 1 ends on the start day itself.
        assert_eq!(end_from_start_and_duration(start, 1), Some(day_end(d(2024, 1, 10))));
    }

    #[test]
    fn test_start_from_end_and_duration() {
        let end = day_end(d(2024, 1, 14));
        assert_eq!(start_from_end_and_duration(end, 5), Some(day_start(d(2024, 1, 10))));
        assert_eq!(start_from_end_and_duration(end, 1), Some(day_start(d(2024, 1, 14))));
    }

    #[test]
    fn test_shift_preserves_time_of_day() {
        let t = d(2024, 1, 31).and_hms_opt(8, 15, 0).unwrap();
        assert_eq!(shift_by_days(t, 1), d(2024, 2, 1).and_hms_opt(8, 15, 0));
        assert_eq!(shift_by_days(t, -31), d(2023, 12, 31).and_hms_opt(8, 15, 0));
    }

    #[test]
    fn test_shift_out_of_range_is_none() {
        let t = day_start(d(2024, 1, 10));
        assert_eq!(shift_by_days(t, i64::MAX), None);
        assert_eq!(shift_by_days(t, u32::MAX as i64), None);
        assert_eq!(end_from_start_and_duration(t, u32::MAX as i64), None);
        assert_eq!(start_from_end_and_duration(t, u32::MAX as i64), None);
    }

    #[test]
    fn test_parse_duration_plain_integers() {
        assert_eq!(parse_duration_days("5"), 5);
        assert_eq!(parse_duration_days(" 12 "), 12);
        assert_eq!(parse_duration_days("1"), 1);
    }

    #[test]
    fn test_parse_duration_unit_terms() {
        assert_eq!(parse_duration_days("3d"), 3);
        assert_eq!(parse_duration_days("2w"), 14);
        assert_eq!(parse_duration_days("1w 3d"), 10);
        assert_eq!(parse_duration_days("2W 1D"), 15);
    }

    #[test]
    fn test_parse_duration_clamps_bad_input_to_one() {
        assert_eq!(parse_duration_days("abc"), 1);
        assert_eq!(parse_duration_days(""), 1);
        assert_eq!(parse_duration_days("-3"), 1);
        assert_eq!(parse_duration_days("0"), 1);
        assert_eq!(parse_duration_days("3x"), 1);
    }

    #[test]
    fn test_parse_date_input_iso() {
        assert_eq!(parse_date_input("2024-01-10"), Some(d(2024, 1, 10)));
        assert_eq!(parse_date_input("not a date"), None);
    }

    #[test]
    fn test_parse_date_input_relative() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date_input("today"), Some(today));
        assert_eq!(parse_date_input("tomorrow"), Some(today + Duration::days(1)));
        assert_eq!(parse_date_input("in 3d"), Some(today + Duration::days(3)));
    }

    #[test]
    fn test_parse_date_input_huge_relative_is_unparseable() {
        assert_eq!(parse_date_input("in 999999999999999d"), None);
        assert_eq!(parse_date_input("in 999999999999999w"), None);
        assert_eq!(parse_date_input("in 999999999999999m"), None);
    }

    #[test]
    fn test_start_end_of_this_week() {
        // 2024-01-10 is a Wednesday.
        let (start, end) = start_end_of_this_week(d(2024, 1, 10));
        assert_eq!(start, d(2024, 1, 8));
        assert_eq!(end, d(2024, 1, 14));
    }
}
