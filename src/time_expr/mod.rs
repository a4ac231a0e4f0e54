//! Natural-language time expression resolution.
//!
//! Turns free text such as "in 10 minutes", "tomorrow at 3pm" or
//! "end of week" plus a reference instant into a single UTC instant.
//!
//! # Pipeline
//!
//! Each stage is tried only if the previous one declines:
//!
//! 1. **Pattern parsers** ([`patterns`]), in fixed priority order
//! 2. **Exact formats** ([`formats::parse_exact`]): ISO-8601, US, named-month
//! 3. **Free-form parse** ([`formats::parse_free_form`])
//! 4. **Language-model fallback** ([`fallback`]), only when configured
//!
//! Whatever stage produced the raw value, [`timezone::normalize`] turns it
//! into UTC: tagged values convert via their offset, untagged wall-clock
//! values are read in the user's timezone (or UTC when none is usable).

pub mod clock;
pub mod fallback;
pub mod formats;
pub mod patterns;
pub mod resolver;
pub mod timezone;

pub use fallback::{LanguageModelFallback, OpenAiCompatibleFallback, UNPARSEABLE_SENTINEL};
pub use patterns::PatternKind;
pub use resolver::{Resolution, ResolutionStage, TimeExpressionResolver};
pub use timezone::{RawInstant, Reference};

use regex::Regex;
use std::sync::OnceLock;

/// Compile `pattern` once into `cell`.
///
/// Returns `None` if the pattern fails to compile, which callers treat as
/// "decline" rather than panicking.
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "time expression regex failed to compile");
            None
        }
    })
    .as_ref()
}

/// Trim, lowercase and collapse internal whitespace.
pub(crate) fn fold_input(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn fold_input_collapses_and_lowercases() {
        assert_eq!(fold_input("  In   10\tMinutes "), "in 10 minutes");
        assert_eq!(fold_input(""), "");
    }

    #[test]
    fn cached_regex_declines_on_bad_pattern() {
        static BAD: OnceLock<Option<Regex>> = OnceLock::new();
        assert!(cached_regex(&BAD, "(unclosed").is_none());
    }
}
