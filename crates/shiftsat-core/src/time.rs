//! Minute-of-day arithmetic and calendar primitives.
//!
//! Every shift pattern and coverage window is expressed in minutes since
//! midnight. Overnight spans (end <= start) are normalized by adding a full
//! day so that downstream comparisons never need to special-case wraparound.

use chrono::{Datelike, NaiveDate, Weekday};

pub const MINUTES_PER_DAY: i64 = 1440;

/// Minutes since midnight for a `(hour, minute)` pair, clamped into `[0, 1440)`.
pub fn time_of_day_minutes(hours: u32, minutes: u32) -> i64 {
    (i64::from(hours) * 60 + i64::from(minutes)).rem_euclid(MINUTES_PER_DAY)
}

/// Normalizes an end-of-shift offset against its start.
///
/// If `end_raw <= start` the shift is overnight: add 1440 so the returned
/// value is always strictly greater than `start`, in `(start, start + 1440]`.
/// Clock times for overnight shifts therefore never exceed 2879.
pub fn normalize_end_minutes(start: i64, end_raw: i64) -> i64 {
    if end_raw <= start {
        end_raw + MINUTES_PER_DAY
    } else {
        end_raw
    }
}

/// Parses an ISO `YYYY-MM-DD` date string.
pub fn parse_day_string(iso: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()
}

/// Lowercase, singular weekday name (`"monday"` .. `"sunday"`) for a date.
pub fn to_day_of_week(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Strict half-open overlap test: `[a0,a1) ∩ [b0,b1) != ∅`.
pub fn ranges_overlap(a0: i64, a1: i64, b0: i64, b1: i64) -> bool {
    a0.max(b0) < a1.min(b1)
}

/// Returns the day offset, in minutes, for a zero-based day index.
pub fn day_offset_minutes(day_index: i64) -> i64 {
    day_index * MINUTES_PER_DAY
}
