//! Relative durations: `in 10 minutes`, `2 hrs`, `in an hour`, `in half an hour`.

use chrono::TimeDelta;
use regex::Regex;
use std::sync::OnceLock;

use crate::time_expr::cached_regex;
use crate::time_expr::timezone::{RawInstant, Reference};

fn duration_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &RE,
        r"^(?:in )?(\d{1,9}) ?(minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|w)$",
    )
}

pub(super) fn parse(input: &str, reference: Reference) -> Option<RawInstant> {
    let delta = match input {
        "in an hour" | "in a hour" => TimeDelta::hours(1),
        "in half an hour" | "in half a hour" => TimeDelta::minutes(30),
        _ => {
            let caps = duration_re()?.captures(input)?;
            let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
            unit_delta(caps.get(2)?.as_str(), amount)?
        }
    };
    reference.instant().checked_add_signed(delta).map(RawInstant::Utc)
}

fn unit_delta(unit: &str, amount: i64) -> Option<TimeDelta> {
    match unit {
        "m" | "min" | "mins" | "minute" | "minutes" => TimeDelta::try_minutes(amount),
        "h" | "hr" | "hrs" | "hour" | "hours" => TimeDelta::try_hours(amount),
        "d" | "day" | "days" => TimeDelta::try_days(amount),
        "w" | "week" | "weeks" => TimeDelta::try_weeks(amount),
        _ => None,
    }
}
