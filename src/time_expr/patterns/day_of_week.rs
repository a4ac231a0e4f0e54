//! `next week`, `next <weekday>`, `on <weekday>`, each with an optional
//! trailing `[at] <time>`.
//!
//! Both weekday forms land strictly after the reference date: naming the
//! reference's own weekday skips a full week. Without a time the result is
//! 00:00 on that day.

use chrono::{NaiveTime, TimeDelta};
use regex::Regex;
use std::sync::OnceLock;

use super::{next_weekday_after, parse_weekday};
use crate::time_expr::cached_regex;
use crate::time_expr::clock::parse_clock_time;
use crate::time_expr::timezone::{RawInstant, Reference};

fn weekday_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"^(?:next|on) ([a-z]+)(?: (?:at )?(.+))?$")
}

pub(super) fn parse(input: &str, reference: Reference) -> Option<RawInstant> {
    if input == "next week" {
        return reference
            .instant()
            .checked_add_signed(TimeDelta::weeks(1))
            .map(RawInstant::Utc);
    }

    let caps = weekday_re()?.captures(input)?;
    let weekday = parse_weekday(caps.get(1)?.as_str())?;
    let time = match caps.get(2) {
        Some(clock) => parse_clock_time(clock.as_str())?,
        None => NaiveTime::MIN,
    };

    let date = next_weekday_after(reference.local_date(), weekday)?;
    Some(RawInstant::Local(date.and_time(time)))
}
