//! Fae reminders: natural-language reminder times and shared trigger lifecycle.
//!
//! This crate provides the scheduling core behind "remind me ..." requests:
//! free text → UTC instant → shared trigger.
//!
//! # Architecture
//!
//! - **Time expressions** ([`time_expr`]): ordered pattern parsers, exact
//!   formats, a free-form parse and an optional language-model fallback,
//!   followed by timezone normalization
//! - **Trigger lifecycle** ([`lifecycle`]): create-before-link attach and
//!   delete-then-recheck reconcile over abstract scheduler and repository
//!   collaborators
//! - **In-memory collaborators** ([`memory`]) for tests and local runs

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod model;
pub mod time_expr;

pub use config::RemindersConfig;
pub use error::{CollaboratorError, LifecycleStage, ReminderError, Result};
pub use lifecycle::{ReconcileOutcome, ReminderRepository, TriggerLifecycleManager, TriggerScheduler};
pub use model::{NewReminder, OwnerRef, PersonId, Reminder, ReminderId, Trigger, TriggerId};
pub use time_expr::{Resolution, ResolutionStage, TimeExpressionResolver};
