//! `at <time>`, `noon`, `midnight` on the reference date.
//!
//! The word `midnight` always means the start of the next calendar day;
//! `at 12am` is 00:00 of the reference date.

use chrono::NaiveTime;

use super::on_reference_day;
use crate::time_expr::clock::parse_clock_time;
use crate::time_expr::timezone::{RawInstant, Reference};

pub(super) fn parse(input: &str, reference: Reference) -> Option<RawInstant> {
    match input {
        "midnight" | "at midnight" => {
            return on_reference_day(reference, 1, NaiveTime::MIN);
        }
        "noon" => return on_reference_day(reference, 0, NaiveTime::from_hms_opt(12, 0, 0)?),
        _ => {}
    }

    let clock = input.strip_prefix("at ")?;
    let time = parse_clock_time(clock)?;
    on_reference_day(reference, 0, time)
}
