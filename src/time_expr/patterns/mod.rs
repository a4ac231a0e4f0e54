//! Pattern parsers for common reminder phrasings.
//!
//! Parsers are a fixed, ordered list of [`PatternKind`] variants rather than
//! a registry discovered at runtime. Order matters: `Tomorrow` runs before
//! `ClockTime` so "tomorrow at 3pm" is never read as a bare clock time.
//!
//! Every parser receives folded input (trimmed, lowercased, single spaces)
//! and either resolves the whole string or declines; there are no partial
//! matches. Relative offsets are added to the reference instant; calendar
//! words use the reference's local date.

mod clock_time;
mod day_of_week;
mod duration;
mod end_of_period;
mod time_of_day;
mod tomorrow;

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use std::fmt;

use super::timezone::{RawInstant, Reference};

/// One pattern parsing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `in 10 minutes`, `2h`, `in half an hour`.
    Duration,
    /// `tomorrow`, `tomorrow at 3pm`.
    Tomorrow,
    /// `at 3pm`, `noon`, `midnight`.
    ClockTime,
    /// `tonight`, `this morning`, `this afternoon`, `this evening`.
    TimeOfDayAlias,
    /// `next week`, `next friday`, `on monday at 9am`.
    DayOfWeek,
    /// `end of day`, `eod`, `end of week`.
    EndOfPeriod,
}

impl PatternKind {
    /// All parsers in priority order.
    pub const PRIORITY: [PatternKind; 6] = [
        PatternKind::Duration,
        PatternKind::Tomorrow,
        PatternKind::ClockTime,
        PatternKind::TimeOfDayAlias,
        PatternKind::DayOfWeek,
        PatternKind::EndOfPeriod,
    ];

    /// Stable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Duration => "duration",
            Self::Tomorrow => "tomorrow",
            Self::ClockTime => "clock_time",
            Self::TimeOfDayAlias => "time_of_day_alias",
            Self::DayOfWeek => "day_of_week",
            Self::EndOfPeriod => "end_of_period",
        }
    }

    /// Run this parser against folded input.
    pub fn parse(self, input: &str, reference: Reference) -> Option<RawInstant> {
        match self {
            Self::Duration => duration::parse(input, reference),
            Self::Tomorrow => tomorrow::parse(input, reference),
            Self::ClockTime => clock_time::parse(input, reference),
            Self::TimeOfDayAlias => time_of_day::parse(input, reference),
            Self::DayOfWeek => day_of_week::parse(input, reference),
            Self::EndOfPeriod => end_of_period::parse(input, reference),
        }
    }

    /// Whether a result from this parser names a time "today" that may
    /// already have passed.
    pub fn is_same_day_time(self) -> bool {
        matches!(self, Self::ClockTime | Self::TimeOfDayAlias)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `parsers` in order and return the first match.
pub fn match_first(
    parsers: &[PatternKind],
    input: &str,
    reference: Reference,
) -> Option<(PatternKind, RawInstant)> {
    parsers
        .iter()
        .find_map(|kind| kind.parse(input, reference).map(|raw| (*kind, raw)))
}

/// Wall-clock value on the user's reference date shifted by `days_ahead`.
fn on_reference_day(reference: Reference, days_ahead: u64, time: NaiveTime) -> Option<RawInstant> {
    let date = reference.local_date().checked_add_days(Days::new(days_ahead))?;
    Some(RawInstant::Local(date.and_time(time)))
}

/// Wall-clock value at `hour:00` on the reference date.
fn today_at_hour(reference: Reference, hour: u32) -> Option<RawInstant> {
    on_reference_day(reference, 0, NaiveTime::from_hms_opt(hour, 0, 0)?)
}

/// Days from `from` until the next `to`, in `1..=7`. Never zero: the same
/// weekday means one week ahead.
fn days_until(from: Weekday, to: Weekday) -> u64 {
    let from = u64::from(from.num_days_from_monday());
    let to = u64::from(to.num_days_from_monday());
    match (to + 7 - from) % 7 {
        0 => 7,
        n => n,
    }
}

/// Next date strictly after `date` falling on `weekday`.
fn next_weekday_after(date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days_until(date.weekday(), weekday)))
}

/// Parse a weekday name or common abbreviation.
fn parse_weekday(word: &str) -> Option<Weekday> {
    let weekday = match word {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}
