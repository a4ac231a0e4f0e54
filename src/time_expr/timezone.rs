//! Timezone normalization of raw resolution output.
//!
//! Every stage produces a [`RawInstant`]. Normalization rules:
//!
//! - [`RawInstant::Utc`] passes through unchanged.
//! - [`RawInstant::Offset`] converts via its fixed offset.
//! - [`RawInstant::Local`] is wall-clock time in the user's timezone when a
//!   valid IANA id is available, otherwise it is read as UTC. An invalid id
//!   never fails resolution.
//!
//! Calendar words ("today", "tomorrow", weekdays) are anchored to the
//! [`Reference`] date as the user sees it, not the UTC date.

use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// A resolved value before timezone normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInstant {
    /// Already a UTC instant (durations, zulu timestamps).
    Utc(DateTime<Utc>),
    /// Wall-clock time with an explicit fixed offset.
    Offset(DateTime<FixedOffset>),
    /// Wall-clock time with no timezone tag.
    Local(NaiveDateTime),
}

impl RawInstant {
    /// Shift the value by `delta`, keeping its tag.
    pub fn checked_add(self, delta: TimeDelta) -> Option<Self> {
        Some(match self {
            Self::Utc(dt) => Self::Utc(dt.checked_add_signed(delta)?),
            Self::Offset(dt) => Self::Offset(dt.checked_add_signed(delta)?),
            Self::Local(naive) => Self::Local(naive.checked_add_signed(delta)?),
        })
    }
}

/// The reference instant plus its wall-clock reading in the user's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    instant: DateTime<Utc>,
    local: NaiveDateTime,
}

impl Reference {
    /// Read `instant` in `tz`, or in UTC when no timezone is usable.
    pub fn new(instant: DateTime<Utc>, tz: Option<Tz>) -> Self {
        let local = match tz {
            Some(tz) => instant.with_timezone(&tz).naive_local(),
            None => instant.naive_utc(),
        };
        Self { instant, local }
    }

    /// A reference read in UTC.
    pub fn utc(instant: DateTime<Utc>) -> Self {
        Self::new(instant, None)
    }

    /// The reference instant.
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// "Today" for the user.
    pub fn local_date(&self) -> NaiveDate {
        self.local.date()
    }

    /// The user's current year, used for year-less dates.
    pub fn local_year(&self) -> i32 {
        self.local.year()
    }
}

/// Look up an IANA timezone id.
///
/// Returns `None` for a missing, blank or unknown id; unknown ids are logged.
pub fn lookup_timezone(id: Option<&str>) -> Option<Tz> {
    let id = id.map(str::trim).filter(|s| !s.is_empty())?;
    match id.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            tracing::warn!(timezone = id, "unknown timezone id, treating local times as UTC");
            None
        }
    }
}

/// Normalize a raw value to UTC.
pub fn normalize(raw: RawInstant, tz: Option<Tz>) -> DateTime<Utc> {
    match raw {
        RawInstant::Utc(dt) => dt,
        RawInstant::Offset(dt) => dt.with_timezone(&Utc),
        RawInstant::Local(naive) => match tz {
            Some(tz) => local_to_utc(naive, tz),
            None => Utc.from_utc_datetime(&naive),
        },
    }
}

/// Convert wall-clock time in `tz` to UTC.
///
/// An ambiguous time (clocks falling back) takes the earlier instant. A time
/// inside a spring-forward gap moves forward by the gap, so "02:30" on a
/// day that skips 02:00-03:00 becomes 03:30 local.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => naive
            .checked_add_signed(TimeDelta::hours(1))
            .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn utc_passes_through() {
        let dt = Utc.with_ymd_and_hms(2025, 12, 30, 14, 30, 0).unwrap();
        let tz = lookup_timezone(Some("America/New_York"));
        assert_eq!(normalize(RawInstant::Utc(dt), tz), dt);
    }

    #[test]
    fn offset_converts_via_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dt = offset.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap();
        let utc = normalize(RawInstant::Offset(dt), None);
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn local_without_timezone_is_utc() {
        let utc = normalize(RawInstant::Local(naive(2026, 1, 6, 0, 0)), None);
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn local_with_timezone_converts() {
        let tz = lookup_timezone(Some("America/New_York"));
        let utc = normalize(RawInstant::Local(naive(2025, 12, 31, 15, 0)), tz);
        assert_eq!(utc, Utc.with_ymd_and_hms(2025, 12, 31, 20, 0, 0).unwrap());
    }

    #[test]
    fn invalid_timezone_fails_open() {
        assert!(lookup_timezone(Some("Mars/Olympus_Mons")).is_none());
        assert!(lookup_timezone(Some("   ")).is_none());
        assert!(lookup_timezone(None).is_none());
    }

    #[test]
    fn round_trip_reproduces_wall_clock() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let wall = naive(2026, 7, 1, 9, 15);
        let utc = local_to_utc(wall, tz);
        assert_eq!(utc.with_timezone(&tz).naive_local(), wall);
    }

    #[test]
    fn spring_forward_gap_moves_forward() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 2026-03-08 02:30 does not exist in New York.
        let utc = local_to_utc(naive(2026, 3, 8, 2, 30), tz);
        assert_eq!(
            utc.with_timezone(&tz).naive_local(),
            naive(2026, 3, 8, 3, 30)
        );
    }

    #[test]
    fn reference_date_follows_user_timezone() {
        // 23:30 UTC on the 30th is already 08:30 on the 31st in Tokyo.
        let instant = Utc.with_ymd_and_hms(2025, 12, 30, 23, 30, 0).unwrap();
        let tokyo = Reference::new(instant, lookup_timezone(Some("Asia/Tokyo")));
        assert_eq!(tokyo.local_date(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(tokyo.instant(), instant);

        let utc = Reference::utc(instant);
        assert_eq!(utc.local_date(), NaiveDate::from_ymd_opt(2025, 12, 30).unwrap());

        let new_year = Utc.with_ymd_and_hms(2025, 12, 31, 20, 0, 0).unwrap();
        let auckland = Reference::new(new_year, lookup_timezone(Some("Pacific/Auckland")));
        assert_eq!(auckland.local_year(), 2026);
    }

    #[test]
    fn fall_back_ambiguity_takes_earliest() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 01:30 happens twice on 2026-11-01; EDT (UTC-4) comes first.
        let utc = local_to_utc(naive(2026, 11, 1, 1, 30), tz);
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap());
    }
}
