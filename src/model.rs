//! Reminder, trigger and owner-link data types.
//!
//! A [`Reminder`] is a person-owned "notify at instant T with details D"
//! record. Reminders fired at the same instant share one [`Trigger`], the
//! physical scheduled firing mechanism. Reminders are linked to zero or more
//! owners via [`OwnerRef`]; a trigger stays alive only while at least one
//! live reminder referencing it still has an owner link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reminder identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(pub String);

/// Opaque trigger identifier issued by the trigger scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub String);

/// Identifier of the person who owns a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Wrap an identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_id!(ReminderId);
string_id!(TriggerId);
string_id!(PersonId);

/// The entity a reminder is attached to.
///
/// A reminder created without an owning entity is linked to itself through
/// [`OwnerRef::Standalone`], so every live reminder contributes at least one
/// reference to its trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerRef {
    /// A to-do item.
    Todo(String),
    /// A bare reminder with no owner entity.
    Standalone(ReminderId),
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo(id) => write!(f, "todo:{id}"),
            Self::Standalone(id) => write!(f, "reminder:{id}"),
        }
    }
}

/// A scheduled firing mechanism for one UTC instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    /// Scheduler-issued identity.
    pub id: TriggerId,
    /// The instant the trigger fires at.
    pub fire_at: DateTime<Utc>,
}

impl Trigger {
    /// Create a trigger value.
    pub fn new(id: TriggerId, fire_at: DateTime<Utc>) -> Self {
        Self { id, fire_at }
    }
}

/// A persisted reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Reminder identity.
    pub id: ReminderId,
    /// Person who created the reminder.
    pub person_id: PersonId,
    /// Free-text details delivered when the reminder fires.
    pub details: String,
    /// UTC fire instant.
    pub fire_at: DateTime<Utc>,
    /// The shared trigger, once one has been confirmed to exist.
    pub trigger_id: Option<TriggerId>,
    /// When the reminder was created.
    pub created_at: DateTime<Utc>,
    /// When the reminder was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the notification was delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// When the person acknowledged the notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Soft-delete stamp. Deleted reminders are never physically removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Reminder {
    /// Build a fresh, not yet persisted reminder.
    pub fn new(
        id: ReminderId,
        person_id: PersonId,
        details: impl Into<String>,
        fire_at: DateTime<Utc>,
        trigger_id: Option<TriggerId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            person_id,
            details: details.into(),
            fire_at,
            trigger_id,
            created_at: now,
            updated_at: now,
            sent_at: None,
            acknowledged_at: None,
            deleted_at: None,
        }
    }

    /// Returns `true` unless the reminder has been soft-deleted.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Record delivery of the notification.
    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.sent_at = Some(at);
        self.updated_at = at;
    }

    /// Record that the person acknowledged the notification.
    pub fn mark_acknowledged(&mut self, at: DateTime<Utc>) {
        self.acknowledged_at = Some(at);
        self.updated_at = at;
    }

    /// Soft-delete the reminder. Deleting twice keeps the first stamp.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
            self.updated_at = at;
        }
    }

    /// Whether this reminder can stand in for a new request with the same
    /// person, instant and details.
    pub fn matches(&self, request: &NewReminder) -> bool {
        self.is_live()
            && self.person_id == request.person_id
            && self.fire_at == request.fire_at
            && self.details == request.details
    }
}

/// Request to attach a reminder at a resolved instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    /// Person creating the reminder.
    pub person_id: PersonId,
    /// Free-text details.
    pub details: String,
    /// Resolved UTC fire instant.
    pub fire_at: DateTime<Utc>,
    /// Owning entity, if any.
    pub owner: Option<OwnerRef>,
}

impl NewReminder {
    /// Create a request for a standalone reminder.
    pub fn new(person_id: PersonId, details: impl Into<String>, fire_at: DateTime<Utc>) -> Self {
        Self {
            person_id,
            details: details.into(),
            fire_at,
            owner: None,
        }
    }

    /// Attach the reminder to an owning entity.
    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }
}
