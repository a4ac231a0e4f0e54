//! Calendar/clock format fallbacks.
//!
//! [`parse_exact`] walks a fixed, ordered list of formats and the first
//! full match wins. [`parse_free_form`] is the last local attempt: it
//! strips connective words, ordinal suffixes and weekday names, then tries
//! a set of date shapes combined with an optional trailing clock time.
//!
//! Values without an explicit offset come back as [`RawInstant::Local`];
//! date-only values carry 00:00 and time-only values use the user's
//! reference date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::cached_regex;
use super::clock::parse_clock_time;
use super::timezone::{RawInstant, Reference};

/// One entry in the exact-format list.
#[derive(Debug, Clone, Copy)]
enum ExactFormat {
    /// RFC 3339 / ISO-8601 with offset or `Z`.
    Rfc3339,
    /// Date and time with an explicit offset.
    Offset(&'static str),
    /// Date and time without an offset.
    DateTime(&'static str),
    /// Date only, 00:00.
    Date(&'static str),
    /// Time only, on the reference date.
    Time(&'static str),
    /// Month and day without a year, in the reference year.
    MonthDay(&'static str),
}

/// Formats in priority order. `%B` accepts both `jan` and `january`.
const EXACT_FORMATS: &[ExactFormat] = &[
    ExactFormat::Rfc3339,
    ExactFormat::Offset("%Y-%m-%dT%H:%M%#z"),
    ExactFormat::Offset("%Y-%m-%d %H:%M:%S%#z"),
    ExactFormat::Offset("%Y-%m-%d %H:%M%#z"),
    ExactFormat::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
    ExactFormat::DateTime("%Y-%m-%dT%H:%M"),
    ExactFormat::DateTime("%Y-%m-%d %H:%M:%S"),
    ExactFormat::DateTime("%Y-%m-%d %H:%M"),
    ExactFormat::Date("%Y-%m-%d"),
    ExactFormat::Time("%H:%M:%S"),
    ExactFormat::Time("%H:%M"),
    ExactFormat::Time("%I:%M:%S %p"),
    ExactFormat::Time("%I:%M %p"),
    ExactFormat::DateTime("%m/%d/%Y %H:%M:%S"),
    ExactFormat::DateTime("%m/%d/%Y %H:%M"),
    ExactFormat::DateTime("%m/%d/%Y %I:%M %p"),
    ExactFormat::Date("%m/%d/%Y"),
    ExactFormat::DateTime("%B %d, %Y %H:%M"),
    ExactFormat::DateTime("%B %d, %Y %I:%M %p"),
    ExactFormat::Date("%B %d, %Y"),
    ExactFormat::Date("%B %d %Y"),
    ExactFormat::Date("%d %B %Y"),
    ExactFormat::MonthDay("%B %d"),
];

impl ExactFormat {
    fn parse(self, input: &str, reference: Reference) -> Option<RawInstant> {
        match self {
            Self::Rfc3339 => {
                let dt = DateTime::parse_from_rfc3339(input).ok()?;
                Some(tag_offset(input, dt))
            }
            Self::Offset(fmt) => {
                let dt = DateTime::parse_from_str(input, fmt).ok()?;
                Some(tag_offset(input, dt))
            }
            Self::DateTime(fmt) => NaiveDateTime::parse_from_str(input, fmt)
                .ok()
                .map(RawInstant::Local),
            Self::Date(fmt) => NaiveDate::parse_from_str(input, fmt)
                .ok()
                .map(|date| RawInstant::Local(date.and_time(NaiveTime::MIN))),
            Self::Time(fmt) => NaiveTime::parse_from_str(input, fmt)
                .ok()
                .map(|time| RawInstant::Local(reference.local_date().and_time(time))),
            Self::MonthDay(fmt) => {
                let with_year = format!("{input} {}", reference.local_year());
                NaiveDate::parse_from_str(&with_year, &format!("{fmt} %Y"))
                    .ok()
                    .map(|date| RawInstant::Local(date.and_time(NaiveTime::MIN)))
            }
        }
    }
}

/// A trailing `Z` means the caller said UTC; any other offset stays a
/// fixed-offset value.
fn tag_offset(input: &str, dt: DateTime<chrono::FixedOffset>) -> RawInstant {
    if input.ends_with(['Z', 'z']) {
        RawInstant::Utc(dt.with_timezone(&Utc))
    } else {
        RawInstant::Offset(dt)
    }
}

/// Try every exact format in order against trimmed input.
pub fn parse_exact(input: &str, reference: Reference) -> Option<RawInstant> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    EXACT_FORMATS
        .iter()
        .find_map(|format| format.parse(input, reference))
}

/// Date shapes tried by the free-form parser, after cleanup.
const FREE_FORM_DATES: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y %B %d",
];

/// Year-less date shapes; the reference year is appended before parsing.
const FREE_FORM_MONTH_DAYS: &[&str] = &["%m/%d", "%B %d", "%d %B"];

fn ordinal_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"\b(\d{1,2})(?:st|nd|rd|th)\b")
}

const WEEKDAY_WORDS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "mon", "tue",
    "tues", "wed", "thu", "thur", "thurs", "fri", "sat", "sun",
];

const FILLER_WORDS: &[&str] = &["at", "on", "the", "of", "by"];

/// Normalize free text into space-separated tokens.
fn clean_tokens(input: &str) -> Vec<String> {
    let lowered = input.trim().to_lowercase().replace(',', " ");
    let without_ordinals = match ordinal_re() {
        Some(re) => re.replace_all(&lowered, "$1").into_owned(),
        None => lowered,
    };

    let mut tokens: Vec<String> = without_ordinals
        .split_whitespace()
        .filter(|t| !FILLER_WORDS.contains(t))
        .map(str::to_owned)
        .collect();

    if tokens
        .first()
        .is_some_and(|t| WEEKDAY_WORDS.contains(&t.as_str()))
    {
        tokens.remove(0);
    }
    tokens
}

fn parse_date_part(part: &str, reference: Reference) -> Option<NaiveDate> {
    FREE_FORM_DATES
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(part, fmt).ok())
        .or_else(|| {
            let with_year = format!("{part} {}", reference.local_year());
            FREE_FORM_MONTH_DAYS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&with_year, &format!("{fmt} %Y")).ok())
        })
}

/// Best-effort parse of loosely formatted dates such as
/// `"Friday, January 16th at 3pm"`, `"16 jan 2026 9:30am"` or `"2026/01/16"`.
pub fn parse_free_form(input: &str, reference: Reference) -> Option<RawInstant> {
    let tokens = clean_tokens(input);
    if tokens.is_empty() {
        return None;
    }

    // A time phrase is at most two tokens ("3 pm") at the end.
    for time_len in (0..=tokens.len().min(2)).rev() {
        let split = tokens.len() - time_len;
        let (date_tokens, time_tokens) = tokens.split_at(split);

        let time = if time_tokens.is_empty() {
            NaiveTime::MIN
        } else {
            match parse_clock_time(&time_tokens.join(" ")) {
                Some(time) => time,
                None => continue,
            }
        };

        if date_tokens.is_empty() {
            return Some(RawInstant::Local(reference.local_date().and_time(time)));
        }

        if let Some(date) = parse_date_part(&date_tokens.join(" "), reference) {
            return Some(RawInstant::Local(date.and_time(time)));
        }
    }
    None
}
