//! Named parts of the reference day.

use super::today_at_hour;
use crate::time_expr::timezone::{RawInstant, Reference};

pub(super) fn parse(input: &str, reference: Reference) -> Option<RawInstant> {
    let hour = match input {
        "tonight" => 20,
        "this morning" => 9,
        "this afternoon" => 14,
        "this evening" => 18,
        _ => return None,
    };
    today_at_hour(reference, hour)
}
