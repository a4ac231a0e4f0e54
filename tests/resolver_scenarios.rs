//! End-to-end time expression resolution scenarios.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use fae_reminders::config::FallbackConfig;
use fae_reminders::time_expr::{OpenAiCompatibleFallback, PatternKind};
use fae_reminders::{ReminderError, ResolutionStage, TimeExpressionResolver};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Tuesday 2025-12-30 14:30 UTC.
fn tuesday() -> DateTime<Utc> {
    utc(2025, 12, 30, 14, 30)
}

// ────────────────────────────────────────────────────────────────────────────
// Worked scenarios
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn in_ten_minutes() {
    let resolver = TimeExpressionResolver::new();
    let instant = resolver.resolve("in 10 minutes", tuesday(), None).await.unwrap();
    assert_eq!(instant, utc(2025, 12, 30, 14, 40));
}

#[tokio::test]
async fn tomorrow_at_three_pm() {
    let resolver = TimeExpressionResolver::new();
    let instant = resolver.resolve("tomorrow at 3pm", tuesday(), None).await.unwrap();
    assert_eq!(instant, utc(2025, 12, 31, 15, 0));
}

#[tokio::test]
async fn next_tuesday_on_a_tuesday_skips_a_week() {
    let resolver = TimeExpressionResolver::new();
    let instant = resolver.resolve("next Tuesday", tuesday(), None).await.unwrap();
    assert_eq!(instant, utc(2026, 1, 6, 0, 0));
}

#[tokio::test]
async fn end_of_week_on_a_friday() {
    let resolver = TimeExpressionResolver::new();
    let friday = utc(2026, 1, 2, 10, 0);
    let instant = resolver.resolve("end of week", friday, None).await.unwrap();
    assert_eq!(instant, utc(2026, 1, 9, 17, 0));
}

#[test]
fn tomorrow_wins_over_clock_time() {
    let resolver = TimeExpressionResolver::new();
    let r = resolver.resolve_local("Tomorrow at 3pm", tuesday(), None).unwrap();
    assert_eq!(r.stage, ResolutionStage::Pattern(PatternKind::Tomorrow));
}

#[test]
fn midnight_is_start_of_next_day() {
    let resolver = TimeExpressionResolver::new();
    for input in ["midnight", "at midnight"] {
        let r = resolver.resolve_local(input, tuesday(), None).unwrap();
        assert_eq!(r.instant, utc(2025, 12, 31, 0, 0), "{input}");
    }
    let noon = resolver.resolve_local("noon", tuesday(), None).unwrap();
    assert_eq!(noon.instant, utc(2025, 12, 30, 12, 0));
}

#[test]
fn case_and_whitespace_are_ignored() {
    let resolver = TimeExpressionResolver::new();
    let r = resolver.resolve_local("  IN   10   MINUTES ", tuesday(), None).unwrap();
    assert_eq!(r.instant, utc(2025, 12, 30, 14, 40));
}

#[tokio::test]
async fn unparseable_carries_help_text() {
    let resolver = TimeExpressionResolver::new();
    let err = resolver.resolve("when pigs fly", tuesday(), None).await.unwrap_err();
    assert!(matches!(err, ReminderError::Unparseable { .. }));
    assert!(!err.is_fatal());
    assert!(err.user_message().contains("in 10 minutes"));
}

// ────────────────────────────────────────────────────────────────────────────
// Properties
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn duration_abbreviations_agree() {
    let resolver = TimeExpressionResolver::new();
    let units: [(&[&str], fn(i64) -> TimeDelta); 4] = [
        (&["minute", "minutes", "min", "mins", "m"], TimeDelta::minutes),
        (&["hour", "hours", "hr", "hrs", "h"], TimeDelta::hours),
        (&["day", "days", "d"], TimeDelta::days),
        (&["week", "weeks", "w"], TimeDelta::weeks),
    ];
    for n in [1_i64, 2, 7, 15, 90, 365] {
        for (spellings, delta) in &units {
            let expected = tuesday() + delta(n);
            for unit in *spellings {
                for text in [
                    format!("in {n} {unit}"),
                    format!("in {n}{unit}"),
                    format!("{n} {unit}"),
                ] {
                    let r = resolver.resolve_local(&text, tuesday(), None).unwrap();
                    assert_eq!(r.instant, expected, "{text}");
                    assert_eq!(r.stage, ResolutionStage::Pattern(PatternKind::Duration));
                }
            }
        }
    }
}

#[test]
fn spelled_out_hours() {
    let resolver = TimeExpressionResolver::new();
    for (text, minutes) in [("in an hour", 60), ("in a hour", 60), ("in half an hour", 30)] {
        let r = resolver.resolve_local(text, tuesday(), None).unwrap();
        assert_eq!(r.instant, tuesday() + TimeDelta::minutes(minutes), "{text}");
    }
}

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

#[test]
fn next_weekday_never_returns_today() {
    let resolver = TimeExpressionResolver::new();
    let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    for offset in 0..14 {
        let day = start + Days::new(offset);
        let reference = Utc.from_utc_datetime(&day.and_hms_opt(9, 15, 0).unwrap());
        for (name, weekday) in WEEKDAYS {
            let r = resolver
                .resolve_local(&format!("next {name}"), reference, None)
                .unwrap();
            let date = r.instant.date_naive();
            assert_eq!(date.weekday(), weekday);
            assert!(date > day, "next {name} from {day}");
            assert!(date <= day + Days::new(7));
            if weekday == day.weekday() {
                assert_eq!(date, day + Days::new(7));
            }
            assert_eq!((r.instant.hour(), r.instant.minute()), (0, 0));
        }
    }
}

#[test]
fn end_of_week_is_a_later_friday_at_five() {
    let resolver = TimeExpressionResolver::new();
    let start = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    for offset in 0..21 {
        let day = start + Days::new(offset);
        let reference = Utc.from_utc_datetime(&day.and_hms_opt(18, 0, 0).unwrap());
        let r = resolver.resolve_local("end of week", reference, None).unwrap();
        assert_eq!(r.instant.weekday(), Weekday::Fri);
        assert_eq!(r.instant.hour(), 17);
        assert!(r.instant > reference);
        if day.weekday() == Weekday::Fri {
            assert_eq!(r.instant.date_naive(), day + Days::new(7));
        }
    }
}

#[test]
fn local_times_round_trip_through_timezone() {
    let resolver = TimeExpressionResolver::new();
    let zones = [
        "America/New_York",
        "America/Los_Angeles",
        "Europe/London",
        "Europe/Berlin",
        "Asia/Kolkata",
        "Asia/Tokyo",
        "Australia/Sydney",
        "Pacific/Auckland",
    ];
    let cases = [
        ("tomorrow at 3pm", 1, 15, 0),
        ("at 08:45", 0, 8, 45),
        ("tonight", 0, 20, 0),
        ("18:20", 0, 18, 20),
    ];
    for zone in zones {
        let tz: Tz = zone.parse().unwrap();
        let today = tuesday().with_timezone(&tz).date_naive();
        for (text, days, hour, minute) in cases {
            let r = resolver.resolve_local(text, tuesday(), Some(zone)).unwrap();
            let local = r.instant.with_timezone(&tz).naive_local();
            let expected = (today + Days::new(days)).and_hms_opt(hour, minute, 0).unwrap();
            assert_eq!(local, expected, "{text} in {zone}");
        }

        let r = resolver
            .resolve_local("2025-12-30 06:10", tuesday(), Some(zone))
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 12, 30)
            .unwrap()
            .and_hms_opt(6, 10, 0)
            .unwrap();
        assert_eq!(r.instant.with_timezone(&tz).naive_local(), expected, "{zone}");
    }
}

#[test]
fn today_is_the_users_calendar_date() {
    let resolver = TimeExpressionResolver::new();
    // 08:30 on Wednesday the 31st in Tokyo, still Tuesday the 30th in UTC.
    let reference = utc(2025, 12, 30, 23, 30);
    let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
    let cases = [
        ("tomorrow at 3pm", (2026, 1, 1, 15)),
        ("at 3pm", (2025, 12, 31, 15)),
        ("end of day", (2025, 12, 31, 17)),
        ("tonight", (2025, 12, 31, 20)),
        ("midnight", (2026, 1, 1, 0)),
        ("on wednesday", (2026, 1, 7, 0)),
        ("end of week", (2026, 1, 2, 17)),
    ];
    for (text, (y, mo, d, h)) in cases {
        let r = resolver.resolve_local(text, reference, Some("Asia/Tokyo")).unwrap();
        let expected = NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        assert_eq!(r.instant.with_timezone(&tokyo).naive_local(), expected, "{text}");
    }

    // Without a timezone the UTC date is "today".
    let r = resolver.resolve_local("at 3pm", reference, None).unwrap();
    assert_eq!(r.instant, utc(2025, 12, 30, 15, 0));
}

#[test]
fn explicit_offsets_ignore_user_timezone() {
    let resolver = TimeExpressionResolver::new();
    let r = resolver
        .resolve_local("2026-01-15T14:30:00+02:00", tuesday(), Some("America/New_York"))
        .unwrap();
    assert_eq!(r.instant, utc(2026, 1, 15, 12, 30));
    assert_eq!(r.stage, ResolutionStage::ExactFormat);
}

// ────────────────────────────────────────────────────────────────────────────
// Language-model fallback over HTTP
// ────────────────────────────────────────────────────────────────────────────

fn fallback_resolver(server: &MockServer) -> TimeExpressionResolver {
    let config = FallbackConfig {
        enabled: true,
        api_url: server.uri(),
        api_model: "test-model".to_owned(),
        timeout_secs: 5,
        ..FallbackConfig::default()
    };
    TimeExpressionResolver::new().with_fallback(Arc::new(OpenAiCompatibleFallback::new(config)))
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn fallback_resolves_what_local_stages_cannot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("2025-12-31T12:30:00")))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = fallback_resolver(&server);
    let instant = resolver
        .resolve("after lunch tomorrow", tuesday(), Some("Asia/Tokyo"))
        .await
        .unwrap();
    assert_eq!(instant, utc(2025, 12, 31, 3, 30));
}

#[tokio::test]
async fn fallback_sentinel_is_unparseable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("UNPARSEABLE")))
        .mount(&server)
        .await;

    let err = fallback_resolver(&server)
        .resolve("when pigs fly", tuesday(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNPARSEABLE");
}

#[tokio::test]
async fn fallback_http_failure_is_unparseable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = fallback_resolver(&server)
        .resolve("when pigs fly", tuesday(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReminderError::Unparseable { .. }));
}

#[tokio::test]
async fn empty_input_never_calls_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("2025-12-31T12:30:00")))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = fallback_resolver(&server);
    for input in ["", " ", "\n\t "] {
        assert!(resolver.resolve(input, tuesday(), None).await.is_err());
    }
    server.verify().await;
}
