//! `end of day` / `eod` and `end of week` / `eow`, both at 17:00.

use chrono::{NaiveTime, Weekday};

use super::{next_weekday_after, today_at_hour};
use crate::time_expr::timezone::{RawInstant, Reference};

const END_OF_BUSINESS_HOUR: u32 = 17;

pub(super) fn parse(input: &str, reference: Reference) -> Option<RawInstant> {
    match input {
        "end of day" | "end of the day" | "eod" => today_at_hour(reference, END_OF_BUSINESS_HOUR),
        "end of week" | "end of the week" | "eow" => {
            // A Friday reference rolls to the following Friday.
            let friday = next_weekday_after(reference.local_date(), Weekday::Fri)?;
            let time = NaiveTime::from_hms_opt(END_OF_BUSINESS_HOUR, 0, 0)?;
            Some(RawInstant::Local(friday.and_time(time)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::time_expr::timezone::lookup_timezone;
    use chrono::{Datelike, NaiveDate, TimeZone, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32) -> Reference {
        Reference::utc(Utc.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap())
    }

    fn local(y: i32, m: u32, d: u32, h: u32) -> Option<RawInstant> {
        Some(RawInstant::Local(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        ))
    }

    #[test]
    fn end_of_day_is_today_at_five() {
        let reference = utc(2025, 12, 30, 14, 30);
        assert_eq!(parse("end of day", reference), local(2025, 12, 30, 17));
        assert_eq!(parse("eod", reference), local(2025, 12, 30, 17));
        assert_eq!(parse("end of the day", reference), local(2025, 12, 30, 17));
    }

    #[test]
    fn end_of_week_from_tuesday() {
        let reference = utc(2025, 12, 30, 14, 30);
        assert_eq!(parse("end of week", reference), local(2026, 1, 2, 17));
    }

    #[test]
    fn end_of_week_on_friday_rolls_a_week() {
        let reference = utc(2026, 1, 2, 10, 0);
        assert_eq!(parse("end of week", reference), local(2026, 1, 9, 17));
        assert_eq!(parse("eow", reference), local(2026, 1, 9, 17));
    }

    #[test]
    fn end_of_week_is_always_a_later_friday() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        for offset in 0..14 {
            let day = start + chrono::Days::new(offset);
            let reference = Reference::utc(Utc.from_utc_datetime(&day.and_hms_opt(23, 59, 0).unwrap()));
            let Some(RawInstant::Local(result)) = parse("end of week", reference) else {
                panic!("end of week must resolve");
            };
            assert_eq!(result.weekday(), Weekday::Fri);
            assert!(result.date() > day);
            assert!((result.date() - day).num_days() <= 7);
        }
    }

    #[test]
    fn end_of_day_uses_the_users_date() {
        // 08:30 on the 31st in Tokyo.
        let instant = Utc.with_ymd_and_hms(2025, 12, 30, 23, 30, 0).unwrap();
        let reference = Reference::new(instant, lookup_timezone(Some("Asia/Tokyo")));
        assert_eq!(parse("end of day", reference), local(2025, 12, 31, 17));
    }

    #[test]
    fn declines_other_periods() {
        let reference = utc(2025, 12, 30, 14, 30);
        assert!(parse("end of month", reference).is_none());
    }
}
