// src/utils/date.rs

//! Relative-date estimation and timestamp parsing.
//!
//! The feed only exposes phrases such as "3 months ago". These are turned into
//! an approximate instant relative to a caller-supplied reference time. Months
//! count as 30 days and years as 365 days, so estimates drift by a few days
//! for older posts; they are meant for ordering and filtering, not display.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;

/// Time units recognized in relative phrases, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    const ALL: [Unit; 7] = [
        Unit::Second,
        Unit::Minute,
        Unit::Hour,
        Unit::Day,
        Unit::Week,
        Unit::Month,
        Unit::Year,
    ];

    fn keyword(self) -> &'static str {
        match self {
            Unit::Second => "second",
            Unit::Minute => "minute",
            Unit::Hour => "hour",
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
            Unit::Year => "year",
        }
    }

    fn delta(self, value: i64) -> Option<TimeDelta> {
        match self {
            Unit::Second => TimeDelta::try_seconds(value),
            Unit::Minute => TimeDelta::try_minutes(value),
            Unit::Hour => TimeDelta::try_hours(value),
            Unit::Day => TimeDelta::try_days(value),
            Unit::Week => TimeDelta::try_weeks(value),
            Unit::Month => TimeDelta::try_days(value.checked_mul(30)?),
            Unit::Year => TimeDelta::try_days(value.checked_mul(365)?),
        }
    }
}

fn unit_patterns() -> &'static [(Unit, Regex)] {
    static PATTERNS: OnceLock<Vec<(Unit, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        Unit::ALL
            .iter()
            .filter_map(|&unit| {
                Regex::new(&format!(r"(\d+)\s*{}", unit.keyword()))
                    .ok()
                    .map(|re| (unit, re))
            })
            .collect()
    })
}

/// Estimate the instant a relative phrase refers to.
///
/// Returns `None` when the phrase carries no usable date evidence.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use community_archiver::utils::date::estimate_date;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
/// let estimated = estimate_date("2 weeks ago", now).unwrap();
/// assert_eq!(estimated, Utc.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap());
/// ```
pub fn estimate_date(phrase: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let phrase = phrase.trim().to_lowercase();
    if phrase.is_empty() {
        return None;
    }

    for (unit, pattern) in unit_patterns() {
        if let Some(caps) = pattern.captures(&phrase) {
            let value: i64 = caps.get(1)?.as_str().parse().ok()?;
            return now.checked_sub_signed(unit.delta(value)?);
        }
    }

    if phrase.contains("just now") || phrase.contains("moments ago") {
        return Some(now);
    }
    if phrase.contains("yesterday") {
        return now.checked_sub_signed(TimeDelta::days(1));
    }

    None
}

/// Parse an archive timestamp as written by the archiver.
///
/// Accepts RFC 3339 (`...Z` or `...+00:00`) and offset-less ISO-8601, which is
/// taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
