//! Trigger lifecycle management.
//!
//! Reminders fired at the same instant share one [`Trigger`]. The
//! [`TriggerLifecycleManager`] keeps trigger existence consistent with the
//! live references held by the repository, without owning any locks:
//!
//! - **Attach** obtains (or creates) the trigger first and only then
//!   persists and links the reminder, so no stored reminder ever points at a
//!   trigger that was never created.
//! - **Detach** unlinks or deletes the reminder, then reconciles its trigger.
//! - **Reconcile** deletes a trigger with zero live references, then
//!   re-queries. A reference that appeared between the first check and the
//!   delete (a concurrent attach) causes the trigger to be recreated for the
//!   same instant.
//!
//! Collaborators are assumed read-your-writes consistent but not
//! serializable.

mod manager;

pub use manager::TriggerLifecycleManager;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CollaboratorError;
use crate::model::{NewReminder, OwnerRef, Reminder, ReminderId, Trigger, TriggerId};

/// Physical scheduler of triggers.
///
/// `get_or_create` must be idempotent for an instant while the trigger is
/// live; the manager does not rely on ids being stable across a delete.
#[async_trait]
pub trait TriggerScheduler: Send + Sync {
    /// Return the live trigger for `fire_at`, creating it if needed.
    async fn get_or_create(&self, fire_at: DateTime<Utc>) -> Result<Trigger, CollaboratorError>;

    /// Delete a trigger. Deleting an unknown trigger returns
    /// [`CollaboratorError::NotFound`].
    async fn delete(&self, trigger_id: &TriggerId) -> Result<(), CollaboratorError>;
}

/// Storage for reminders and their owner links.
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Persist a new reminder.
    async fn create(&self, reminder: Reminder) -> Result<Reminder, CollaboratorError>;

    /// Load a reminder, live or soft-deleted.
    async fn get(&self, id: &ReminderId) -> Result<Option<Reminder>, CollaboratorError>;

    /// Link a reminder to an owner. Linking twice is a no-op.
    async fn link_to_owner(&self, id: &ReminderId, owner: &OwnerRef)
    -> Result<(), CollaboratorError>;

    /// Remove an owner link. Removing a missing link is a no-op.
    async fn unlink_from_owner(
        &self,
        id: &ReminderId,
        owner: &OwnerRef,
    ) -> Result<(), CollaboratorError>;

    /// Owners currently linked to a reminder.
    async fn linked_owners(&self, id: &ReminderId) -> Result<Vec<OwnerRef>, CollaboratorError>;

    /// Every owner reference that keeps `trigger_id` alive: the links of all
    /// live reminders pointing at it.
    ///
    /// A live reminder with no links yet (mid-attach) must still be counted,
    /// as [`OwnerRef::Standalone`] of itself.
    async fn get_live_owner_refs(
        &self,
        trigger_id: &TriggerId,
    ) -> Result<Vec<OwnerRef>, CollaboratorError>;

    /// Soft-delete a reminder.
    async fn delete(&self, id: &ReminderId) -> Result<(), CollaboratorError>;

    /// A live reminder equivalent to `request` (same person, instant and
    /// details), if one exists.
    async fn find_reusable(
        &self,
        request: &NewReminder,
    ) -> Result<Option<Reminder>, CollaboratorError>;

    /// The trigger used by any live reminder firing at `fire_at`.
    async fn trigger_for_instant(
        &self,
        fire_at: DateTime<Utc>,
    ) -> Result<Option<TriggerId>, CollaboratorError>;

    /// Re-point live reminders from `from` to `to` after a trigger was
    /// recreated under a new id.
    async fn reassign_trigger(&self, from: &TriggerId, to: &TriggerId)
    -> Result<(), CollaboratorError>;
}

/// What a detach or reconcile did to the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Other live references remain; the trigger was left alone.
    StillReferenced,
    /// No references remained and the trigger was deleted.
    Deleted,
    /// A reference appeared while deleting; the trigger was recreated.
    Recreated {
        /// The live trigger after recreation.
        trigger: Trigger,
    },
    /// The trigger had no references but could not be deleted. It needs
    /// out-of-band cleanup; the reminder change itself succeeded.
    Orphaned {
        /// The trigger left behind.
        trigger: Trigger,
        /// Scheduler failure, for operator logs.
        cause: String,
    },
    /// The reminder never had a trigger.
    NoTrigger,
}

impl ReconcileOutcome {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StillReferenced => "still_referenced",
            Self::Deleted => "deleted",
            Self::Recreated { .. } => "recreated",
            Self::Orphaned { .. } => "orphaned",
            Self::NoTrigger => "no_trigger",
        }
    }
}
