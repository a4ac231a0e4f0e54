//! `tomorrow` and `tomorrow [at] <time>`.

use chrono::TimeDelta;

use super::on_reference_day;
use crate::time_expr::clock::parse_clock_time;
use crate::time_expr::timezone::{RawInstant, Reference};

pub(super) fn parse(input: &str, reference: Reference) -> Option<RawInstant> {
    if input == "tomorrow" {
        return reference
            .instant()
            .checked_add_signed(TimeDelta::days(1))
            .map(RawInstant::Utc);
    }

    let rest = input.strip_prefix("tomorrow ")?;
    let clock = rest.strip_prefix("at ").unwrap_or(rest);
    let time = parse_clock_time(clock)?;
    on_reference_day(reference, 1, time)
}
