//! Error types for reminder resolution and trigger lifecycle management.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`ReminderError::code()`].
//! Callers relay [`ReminderError::user_message()`] to end users; the
//! underlying cause stays in the Display text for operator logs.

use std::fmt;

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Free text matched no resolution stage.
    pub const UNPARSEABLE: &str = "UNPARSEABLE";

    /// Trigger creation/deletion or a compensating step failed.
    pub const LIFECYCLE_CONFLICT: &str = "LIFECYCLE_CONFLICT";

    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Filesystem error while reading or writing configuration.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Message relayed verbatim to users when a time expression cannot be resolved.
pub const UNPARSEABLE_HELP: &str = "I couldn't understand that time. Try something like \
\"in 10 minutes\", \"in an hour\", \"tomorrow at 3pm\", \"at 15:00\", \"tonight\", \
\"next Friday\", \"on Monday at 9am\", \"end of day\", \"end of week\", \
\"2026-01-15 14:30\" or \"Jan 15, 2026\".";

/// Message relayed to users when a trigger could not be created or removed.
pub const LIFECYCLE_HELP: &str =
    "Sorry, I could not schedule or unschedule that reminder. Please try again.";

/// The step of the trigger lifecycle protocol that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    /// Obtaining or creating the shared trigger for an instant.
    CreateTrigger,
    /// Persisting a new reminder after its trigger exists.
    PersistReminder,
    /// Linking a reminder to its owner.
    LinkOwner,
    /// Unlinking a reminder from an owner.
    UnlinkOwner,
    /// Soft-deleting a reminder.
    DeleteReminder,
    /// Loading a reminder by id.
    LoadReminder,
    /// Querying live references of a trigger.
    QueryReferences,
    /// Recreating a trigger after a raced delete.
    RecreateTrigger,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateTrigger => "create trigger",
            Self::PersistReminder => "persist reminder",
            Self::LinkOwner => "link owner",
            Self::UnlinkOwner => "unlink owner",
            Self::DeleteReminder => "delete reminder",
            Self::LoadReminder => "load reminder",
            Self::QueryReferences => "query trigger references",
            Self::RecreateTrigger => "recreate trigger",
        };
        f.write_str(name)
    }
}

/// Top-level error type for the reminders crate.
///
/// Core operations only ever return [`Unparseable`](Self::Unparseable) or
/// [`LifecycleConflict`](Self::LifecycleConflict).
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    /// Input matched no resolution stage.
    #[error("[{}] could not resolve time expression {input:?}", error_codes::UNPARSEABLE)]
    Unparseable {
        /// The raw input as supplied by the caller.
        input: String,
    },

    /// A trigger lifecycle step failed before the operation could complete.
    #[error("[{}] {stage} failed: {cause}", error_codes::LIFECYCLE_CONFLICT)]
    LifecycleConflict {
        /// Which step failed.
        stage: LifecycleStage,
        /// Underlying collaborator failure, for operator logs only.
        cause: String,
    },

    /// Configuration error.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// I/O error.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl ReminderError {
    /// Build an [`Unparseable`](Self::Unparseable) error for `input`.
    pub fn unparseable(input: impl Into<String>) -> Self {
        Self::Unparseable {
            input: input.into(),
        }
    }

    /// Build a [`LifecycleConflict`](Self::LifecycleConflict) error.
    pub fn conflict(stage: LifecycleStage, cause: impl fmt::Display) -> Self {
        Self::LifecycleConflict {
            stage,
            cause: cause.to_string(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unparseable { .. } => error_codes::UNPARSEABLE,
            Self::LifecycleConflict { .. } => error_codes::LIFECYCLE_CONFLICT,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }

    /// Text safe to show to the person who asked for the reminder.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unparseable { .. } => UNPARSEABLE_HELP,
            Self::LifecycleConflict { .. } => LIFECYCLE_HELP,
            Self::Config(_) | Self::Io(_) => "Reminders are not configured correctly.",
        }
    }

    /// Returns true for failures of the system rather than of the user's input.
    ///
    /// Unparseable input is not fatal: the user rephrases instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Unparseable { .. })
    }
}

/// Errors reported by external collaborators (trigger scheduler, repository,
/// language-model endpoint).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The collaborator could not be reached or timed out.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ReminderError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn unparseable_code_and_message() {
        let err = ReminderError::unparseable("someday maybe");
        assert_eq!(err.code(), "UNPARSEABLE");
        assert!(err.to_string().starts_with("[UNPARSEABLE]"));
        assert!(err.to_string().contains("someday maybe"));
        assert!(err.user_message().contains("tomorrow at 3pm"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn lifecycle_conflict_keeps_cause_out_of_user_message() {
        let err = ReminderError::conflict(
            LifecycleStage::CreateTrigger,
            CollaboratorError::Unavailable("scheduler down".into()),
        );
        assert_eq!(err.code(), "LIFECYCLE_CONFLICT");
        assert!(err.to_string().contains("create trigger failed"));
        assert!(err.to_string().contains("scheduler down"));
        assert!(!err.user_message().contains("scheduler down"));
        assert!(err.is_fatal());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ReminderError = io.into();
        assert_eq!(err.code(), "IO_ERROR");
    }

    #[test]
    fn stage_display_is_lowercase_phrase() {
        assert_eq!(LifecycleStage::RecreateTrigger.to_string(), "recreate trigger");
        assert_eq!(LifecycleStage::QueryReferences.to_string(), "query trigger references");
    }
}
