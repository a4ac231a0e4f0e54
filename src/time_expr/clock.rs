//! Shared time-of-day grammar.
//!
//! Accepts 12-hour times with a meridiem (`3pm`, `3:00pm`, `3 pm`,
//! `11:45:30 p.m.`), 24-hour times with minutes (`15:00`, `09:05:30`) and the
//! words `noon` and `midnight`. A bare number without a meridiem or minutes
//! (`15`) is rejected so plain counts are never read as clock times.
//!
//! Input must already be trimmed and lowercased.

use chrono::NaiveTime;
use regex::Regex;
use std::sync::OnceLock;

use super::cached_regex;

fn clock_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"^(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)?$",
    )
}

/// Parse a time of day. `midnight` yields 00:00; callers that give it
/// next-day semantics check for the word themselves.
pub fn parse_clock_time(input: &str) -> Option<NaiveTime> {
    match input {
        "noon" | "midday" => return NaiveTime::from_hms_opt(12, 0, 0),
        "midnight" => return NaiveTime::from_hms_opt(0, 0, 0),
        _ => {}
    }

    let caps = clock_re()?.captures(input)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: Option<u32> = match caps.get(2) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    let hour = match caps.get(4).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            let pm = meridiem.starts_with('p');
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            }
        }
        None => {
            // 24-hour form must carry minutes.
            if minute.is_none() {
                return None;
            }
            hour
        }
    };

    NaiveTime::from_hms_opt(hour, minute.unwrap_or(0), second)
}
