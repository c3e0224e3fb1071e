//! Calendar and time-of-day features, read from the station's local clock.

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;

/// Part of the day an hour falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    /// 05:00 to 11:59.
    Morning,
    /// 12:00 to 16:59.
    Afternoon,
    /// 17:00 to 20:59.
    Evening,
    /// 21:00 to 04:59.
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

/// Indian meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    /// March to May.
    Summer,
    /// June to September.
    Monsoon,
    /// October and November.
    PostMonsoon,
    /// December to February.
    Winter,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Summer,
            6..=9 => Season::Monsoon,
            10 | 11 => Season::PostMonsoon,
            _ => Season::Winter,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Summer => "summer",
            Season::Monsoon => "monsoon",
            Season::PostMonsoon => "post_monsoon",
            Season::Winter => "winter",
        }
    }
}

/// Morning (07-10) and evening (17-20) traffic peaks.
pub fn is_rush_hour(hour: u32) -> bool {
    (7..=10).contains(&hour) || (17..=20).contains(&hour)
}

/// Saturday or Sunday.
pub fn is_weekend(ts: &impl Datelike) -> bool {
    ts.weekday().num_days_from_monday() >= 5
}

/// `(sin, cos)` of a cyclic value with the given period.
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Numeric temporal columns, in output order.
pub const NUMERIC_COLUMNS: [&str; 13] = [
    "year",
    "month",
    "day",
    "hour",
    "day_of_week",
    "day_of_year",
    "week_of_year",
    "is_weekend",
    "is_rush_hour",
    "hour_sin",
    "hour_cos",
    "month_sin",
    "month_cos",
];

/// Values for [`NUMERIC_COLUMNS`] at one local wall-clock time.
pub fn numeric_values(ts: &NaiveDateTime) -> [f64; 13] {
    let hour = ts.hour();
    let month = ts.month();
    let (hour_sin, hour_cos) = cyclical(hour as f64, 24.0);
    let (month_sin, month_cos) = cyclical(month as f64, 12.0);
    [
        ts.year() as f64,
        month as f64,
        ts.day() as f64,
        hour as f64,
        ts.weekday().num_days_from_monday() as f64,
        ts.ordinal() as f64,
        ts.iso_week().week() as f64,
        if is_weekend(ts) { 1.0 } else { 0.0 },
        if is_rush_hour(hour) { 1.0 } else { 0.0 },
        hour_sin,
        hour_cos,
        month_sin,
        month_cos,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
    }

    #[test]
    fn seasons() {
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(4), Season::Summer);
        assert_eq!(Season::from_month(7), Season::Monsoon);
        assert_eq!(Season::from_month(10), Season::PostMonsoon);
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::PostMonsoon.as_str(), "post_monsoon");
    }

    #[test]
    fn rush_hours() {
        assert!(!is_rush_hour(6));
        assert!(is_rush_hour(7));
        assert!(is_rush_hour(10));
        assert!(!is_rush_hour(11));
        assert!(is_rush_hour(20));
        assert!(!is_rush_hour(21));
    }

    #[test]
    fn calendar_values() {
        // 2024-01-06 was a Saturday.
        let ts = at(2024, 1, 6, 18);
        let v = numeric_values(&ts);
        assert_eq!(v[0], 2024.0);
        assert_eq!(v[3], 18.0);
        assert_eq!(v[4], 5.0);
        assert_eq!(v[5], 6.0);
        assert_eq!(v[6], 1.0);
        assert_eq!(v[7], 1.0);
        assert_eq!(v[8], 1.0);
        assert_relative_eq!(v[9], (2.0 * PI * 18.0 / 24.0).sin(), epsilon = 1e-12);
    }
}
