//! The time expression resolver: ordered pipeline plus timezone normalization.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use super::fallback::{LanguageModelFallback, OpenAiCompatibleFallback, UNPARSEABLE_SENTINEL};
use super::formats::{parse_exact, parse_free_form};
use super::patterns::{PatternKind, match_first};
use super::timezone::{RawInstant, Reference, lookup_timezone, normalize};
use super::fold_input;
use crate::config::ResolverConfig;
use crate::error::{ReminderError, Result};

/// Which pipeline stage produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    /// One of the pattern parsers.
    Pattern(PatternKind),
    /// The exact-format list.
    ExactFormat,
    /// The free-form date/time parse.
    FreeForm,
    /// The language-model fallback.
    LanguageModel,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(kind) => write!(f, "pattern:{kind}"),
            Self::ExactFormat => f.write_str("exact_format"),
            Self::FreeForm => f.write_str("free_form"),
            Self::LanguageModel => f.write_str("language_model"),
        }
    }
}

/// A resolved instant and the stage that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The normalized UTC instant.
    pub instant: DateTime<Utc>,
    /// The stage that matched.
    pub stage: ResolutionStage,
}

/// Turns free text plus a reference instant into a UTC instant.
///
/// Stateless between calls; safe to share behind an `Arc`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use fae_reminders::time_expr::TimeExpressionResolver;
///
/// let resolver = TimeExpressionResolver::new();
/// let reference = Utc.with_ymd_and_hms(2025, 12, 30, 14, 30, 0).unwrap();
/// let resolved = resolver.resolve_local("in 10 minutes", reference, None).unwrap();
/// assert_eq!(resolved.instant, Utc.with_ymd_and_hms(2025, 12, 30, 14, 40, 0).unwrap());
/// ```
#[derive(Clone)]
pub struct TimeExpressionResolver {
    patterns: Vec<PatternKind>,
    fallback: Option<Arc<dyn LanguageModelFallback>>,
    default_timezone: Option<String>,
    roll_past_times_forward: bool,
}

impl fmt::Debug for TimeExpressionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeExpressionResolver")
            .field("patterns", &self.patterns)
            .field("fallback", &self.fallback.is_some())
            .field("default_timezone", &self.default_timezone)
            .field("roll_past_times_forward", &self.roll_past_times_forward)
            .finish()
    }
}

impl Default for TimeExpressionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeExpressionResolver {
    /// Create a resolver with all pattern parsers and no fallback.
    pub fn new() -> Self {
        Self {
            patterns: PatternKind::PRIORITY.to_vec(),
            fallback: None,
            default_timezone: None,
            roll_past_times_forward: false,
        }
    }

    /// Build a resolver from configuration, wiring the HTTP fallback when enabled.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut resolver = Self::new().with_roll_past_times_forward(config.roll_past_times_forward);
        if let Some(tz) = config.default_timezone.as_deref() {
            resolver = resolver.with_default_timezone(tz);
        }
        if config.fallback.enabled {
            resolver = resolver.with_fallback(Arc::new(OpenAiCompatibleFallback::new(
                config.fallback.clone(),
            )));
        }
        resolver
    }

    /// Attach a language-model fallback.
    pub fn with_fallback(mut self, fallback: Arc<dyn LanguageModelFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Timezone used when a call passes none.
    pub fn with_default_timezone(mut self, tz: impl Into<String>) -> Self {
        self.default_timezone = Some(tz.into());
        self
    }

    /// Roll clock times and day-part aliases that already passed to the next day.
    pub fn with_roll_past_times_forward(mut self, enabled: bool) -> Self {
        self.roll_past_times_forward = enabled;
        self
    }

    /// Whether a language-model fallback is attached.
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Resolve `text` to a UTC instant.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Unparseable`] when no stage matches.
    pub async fn resolve(
        &self,
        text: &str,
        reference: DateTime<Utc>,
        timezone_id: Option<&str>,
    ) -> Result<DateTime<Utc>> {
        let token = CancellationToken::new();
        self.resolve_detailed(text, reference, timezone_id, &token)
            .await
            .map(|r| r.instant)
    }

    /// Resolve `text`, reporting which stage matched.
    ///
    /// `cancel` is only observed around the language-model call; a
    /// cancelled fallback resolves as unparseable.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Unparseable`] when no stage matches, the
    /// fallback fails, or the call is cancelled.
    pub async fn resolve_detailed(
        &self,
        text: &str,
        reference: DateTime<Utc>,
        timezone_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        if text.trim().is_empty() {
            return Err(ReminderError::unparseable(text));
        }

        if let Some(resolution) = self.resolve_local(text, reference, timezone_id) {
            return Ok(resolution);
        }

        let Some(fallback) = self.fallback.as_ref() else {
            tracing::debug!(input = text, "no local stage matched and no fallback configured");
            return Err(ReminderError::unparseable(text));
        };

        if cancel.is_cancelled() {
            return Err(ReminderError::unparseable(text));
        }

        let zone_id = self
            .effective_timezone_id(timezone_id)
            .unwrap_or("UTC")
            .to_owned();
        let reference_iso = reference.format("%Y-%m-%dT%H:%M:%S").to_string();

        let reply = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(input = text, "time fallback cancelled");
                return Err(ReminderError::unparseable(text));
            }
            reply = fallback.parse(text.trim(), &zone_id, &reference_iso) => reply,
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(input = text, error = %e, "time fallback failed");
                return Err(ReminderError::unparseable(text));
            }
        };

        let tz = self.timezone(timezone_id);
        let instant = interpret_fallback_reply(&reply, reference, tz).ok_or_else(|| {
            tracing::debug!(input = text, reply = %reply, "time fallback could not resolve");
            ReminderError::unparseable(text)
        })?;

        tracing::debug!(input = text, %instant, stage = "language_model", "time expression resolved");
        Ok(Resolution {
            instant,
            stage: ResolutionStage::LanguageModel,
        })
    }

    /// Run the local stages only (patterns, exact formats, free-form).
    ///
    /// Returns `None` when none of them match; never touches the network.
    pub fn resolve_local(
        &self,
        text: &str,
        reference: DateTime<Utc>,
        timezone_id: Option<&str>,
    ) -> Option<Resolution> {
        let folded = fold_input(text);
        if folded.is_empty() {
            return None;
        }
        let tz = self.timezone(timezone_id);
        let anchor = Reference::new(reference, tz);

        let resolution = if let Some((kind, raw)) = match_first(&self.patterns, &folded, anchor) {
            let mut instant = normalize(raw, tz);
            if self.roll_past_times_forward && kind.is_same_day_time() && instant < reference {
                instant = roll_to_next_day(raw, tz).unwrap_or(instant);
            }
            Resolution {
                instant,
                stage: ResolutionStage::Pattern(kind),
            }
        } else if let Some(raw) = parse_exact(text, anchor) {
            Resolution {
                instant: normalize(raw, tz),
                stage: ResolutionStage::ExactFormat,
            }
        } else {
            let raw = parse_free_form(text, anchor)?;
            Resolution {
                instant: normalize(raw, tz),
                stage: ResolutionStage::FreeForm,
            }
        };

        tracing::debug!(
            input = text,
            instant = %resolution.instant,
            stage = %resolution.stage,
            "time expression resolved"
        );
        Some(resolution)
    }

    fn effective_timezone_id<'a>(&'a self, timezone_id: Option<&'a str>) -> Option<&'a str> {
        timezone_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(self.default_timezone.as_deref())
    }

    fn timezone(&self, timezone_id: Option<&str>) -> Option<Tz> {
        lookup_timezone(self.effective_timezone_id(timezone_id))
    }
}

fn roll_to_next_day(raw: RawInstant, tz: Option<Tz>) -> Option<DateTime<Utc>> {
    raw.checked_add(TimeDelta::days(1)).map(|next| normalize(next, tz))
}

/// Strip decoration a model tends to add and run the reply through the
/// exact-format and free-form stages.
fn interpret_fallback_reply(
    reply: &str,
    reference: DateTime<Utc>,
    tz: Option<Tz>,
) -> Option<DateTime<Utc>> {
    let cleaned = reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())?
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(UNPARSEABLE_SENTINEL) {
        return None;
    }
    let anchor = Reference::new(reference, tz);
    let raw = parse_exact(cleaned, anchor).or_else(|| parse_free_form(cleaned, anchor))?;
    Some(normalize(raw, tz))
}
