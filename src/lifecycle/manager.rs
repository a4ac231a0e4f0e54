use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{ReconcileOutcome, ReminderRepository, TriggerScheduler};
use crate::error::{CollaboratorError, LifecycleStage, ReminderError, Result};
use crate::model::{NewReminder, OwnerRef, Reminder, ReminderId, Trigger, TriggerId};

const MAX_SETTLE_ATTEMPTS: usize = 3;

/// Attaches reminders to shared triggers and reconciles triggers on detach.
///
/// Holds no state between calls; concurrent calls for the same instant are
/// safe as long as the collaborators are read-your-writes consistent.
#[derive(Clone)]
pub struct TriggerLifecycleManager {
    scheduler: Arc<dyn TriggerScheduler>,
    repository: Arc<dyn ReminderRepository>,
}

impl TriggerLifecycleManager {
    /// Create a manager over the given collaborators.
    pub fn new(scheduler: Arc<dyn TriggerScheduler>, repository: Arc<dyn ReminderRepository>) -> Self {
        Self {
            scheduler,
            repository,
        }
    }

    /// Create (or reuse) a reminder for `request` and link it to its owner.
    ///
    /// The trigger is confirmed to exist before anything is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::LifecycleConflict`] when the trigger cannot
    /// be obtained (nothing is written), when it cannot be confirmed after
    /// persisting, or when persisting or linking the reminder fails. Partial
    /// work is compensated best-effort.
    pub async fn attach_reminder(&self, request: NewReminder) -> Result<Reminder> {
        if let Some(reused) = self.try_reuse(&request).await? {
            return Ok(reused);
        }

        let trigger = self.obtain_trigger(&request).await?;

        let reminder = Reminder::new(
            ReminderId::new(Uuid::new_v4().to_string()),
            request.person_id.clone(),
            request.details.clone(),
            request.fire_at,
            Some(trigger.id.clone()),
            Utc::now(),
        );
        let mut reminder = match self.repository.create(reminder).await {
            Ok(reminder) => reminder,
            Err(e) => {
                tracing::warn!(trigger_id = %trigger.id, error = %e, "reminder persist failed, compensating");
                self.compensate(&trigger).await;
                return Err(ReminderError::conflict(LifecycleStage::PersistReminder, e));
            }
        };

        // A reconcile may have deleted the trigger between obtain and persist.
        let trigger = match self.settle_trigger(trigger.clone()).await {
            Ok(settled) => settled,
            Err(e) => {
                tracing::warn!(trigger_id = %trigger.id, error = %e, "could not confirm trigger, rolling back");
                self.abandon_attach(&reminder.id, &trigger).await;
                return Err(ReminderError::conflict(LifecycleStage::CreateTrigger, e));
            }
        };
        reminder.trigger_id = Some(trigger.id.clone());

        let owner = request
            .owner
            .clone()
            .unwrap_or_else(|| OwnerRef::Standalone(reminder.id.clone()));
        if let Err(e) = self.repository.link_to_owner(&reminder.id, &owner).await {
            tracing::warn!(reminder_id = %reminder.id, %owner, error = %e, "owner link failed, compensating");
            self.abandon_attach(&reminder.id, &trigger).await;
            return Err(ReminderError::conflict(LifecycleStage::LinkOwner, e));
        }

        tracing::info!(
            reminder_id = %reminder.id,
            trigger_id = %trigger.id,
            fire_at = %reminder.fire_at,
            %owner,
            "reminder attached"
        );
        Ok(reminder)
    }

    /// Remove a reminder from `owner` (or delete it outright when `owner`
    /// is `None`), then reconcile its trigger.
    ///
    /// A reminder left with no owners is soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::LifecycleConflict`] when the reminder cannot
    /// be loaded or updated, or when a raced trigger cannot be recreated.
    /// A trigger that cannot be deleted is reported as
    /// [`ReconcileOutcome::Orphaned`], not as an error.
    pub async fn detach_reminder(
        &self,
        reminder_id: &ReminderId,
        owner: Option<&OwnerRef>,
    ) -> Result<ReconcileOutcome> {
        let reminder = self
            .repository
            .get(reminder_id)
            .await
            .map_err(|e| ReminderError::conflict(LifecycleStage::LoadReminder, e))?
            .ok_or_else(|| {
                ReminderError::conflict(
                    LifecycleStage::LoadReminder,
                    CollaboratorError::NotFound(reminder_id.to_string()),
                )
            })?;

        match owner {
            Some(owner) => {
                self.repository
                    .unlink_from_owner(reminder_id, owner)
                    .await
                    .map_err(|e| ReminderError::conflict(LifecycleStage::UnlinkOwner, e))?;
                let remaining = self
                    .repository
                    .linked_owners(reminder_id)
                    .await
                    .map_err(|e| ReminderError::conflict(LifecycleStage::QueryReferences, e))?;
                if remaining.is_empty() {
                    self.delete_reminder(reminder_id).await?;
                }
            }
            None => self.delete_reminder(reminder_id).await?,
        }

        // Live reminders can be re-pointed to a recreated trigger; read the
        // current one back.
        let trigger_id = match self.repository.get(reminder_id).await {
            Ok(Some(current)) => current.trigger_id,
            Ok(None) => reminder.trigger_id,
            Err(e) => {
                tracing::debug!(%reminder_id, error = %e, "could not re-read reminder, using loaded trigger");
                reminder.trigger_id
            }
        };
        let Some(trigger_id) = trigger_id else {
            return Ok(ReconcileOutcome::NoTrigger);
        };
        let outcome = self
            .reconcile_trigger(&Trigger::new(trigger_id, reminder.fire_at))
            .await?;
        tracing::info!(%reminder_id, outcome = outcome.name(), "reminder detached");
        Ok(outcome)
    }

    /// Delete `trigger` if nothing references it, then re-check and recreate
    /// it if a reference appeared in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::LifecycleConflict`] when references cannot be
    /// queried or a raced trigger cannot be recreated.
    pub async fn reconcile_trigger(&self, trigger: &Trigger) -> Result<ReconcileOutcome> {
        if !self.live_refs(&trigger.id).await?.is_empty() {
            tracing::debug!(trigger_id = %trigger.id, "trigger still referenced");
            return Ok(ReconcileOutcome::StillReferenced);
        }

        match self.scheduler.delete(&trigger.id).await {
            Ok(()) => {}
            Err(CollaboratorError::NotFound(_)) => {
                tracing::debug!(trigger_id = %trigger.id, "trigger already gone");
            }
            Err(e) => {
                tracing::warn!(
                    trigger_id = %trigger.id,
                    fire_at = %trigger.fire_at,
                    error = %e,
                    "orphaned trigger needs cleanup"
                );
                return Ok(ReconcileOutcome::Orphaned {
                    trigger: trigger.clone(),
                    cause: e.to_string(),
                });
            }
        }

        // Authoritative re-check: an attach may have raced the delete.
        if self.live_refs(&trigger.id).await?.is_empty() {
            tracing::debug!(trigger_id = %trigger.id, "trigger deleted");
            return Ok(ReconcileOutcome::Deleted);
        }

        let recreated = self
            .settle_trigger(trigger.clone())
            .await
            .map_err(|e| ReminderError::conflict(LifecycleStage::RecreateTrigger, e))?;
        tracing::info!(
            old_trigger_id = %trigger.id,
            trigger_id = %recreated.id,
            fire_at = %trigger.fire_at,
            "trigger recreated after raced delete"
        );
        Ok(ReconcileOutcome::Recreated { trigger: recreated })
    }

    /// Link the owner to an equivalent live reminder instead of creating one.
    async fn try_reuse(&self, request: &NewReminder) -> Result<Option<Reminder>> {
        let existing = match self.repository.find_reusable(request).await {
            Ok(Some(existing)) if existing.trigger_id.is_some() => existing,
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "reusable reminder lookup failed, creating a new one");
                return Ok(None);
            }
        };

        let owner = request
            .owner
            .clone()
            .unwrap_or_else(|| OwnerRef::Standalone(existing.id.clone()));
        self.repository
            .link_to_owner(&existing.id, &owner)
            .await
            .map_err(|e| ReminderError::conflict(LifecycleStage::LinkOwner, e))?;

        // A concurrent detach may have deleted it between lookup and link.
        match self.repository.get(&existing.id).await {
            Ok(Some(current)) if current.is_live() => {
                tracing::info!(reminder_id = %current.id, %owner, "reminder reused");
                Ok(Some(current))
            }
            _ => {
                tracing::debug!(reminder_id = %existing.id, "reusable reminder vanished");
                Ok(None)
            }
        }
    }

    async fn obtain_trigger(&self, request: &NewReminder) -> Result<Trigger> {
        match self.repository.trigger_for_instant(request.fire_at).await {
            Ok(Some(id)) => return Ok(Trigger::new(id, request.fire_at)),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "trigger lookup failed, asking scheduler");
            }
        }
        self.scheduler
            .get_or_create(request.fire_at)
            .await
            .map_err(|e| {
                tracing::error!(fire_at = %request.fire_at, error = %e, "trigger creation failed");
                ReminderError::conflict(LifecycleStage::CreateTrigger, e)
            })
    }

    /// Ask the scheduler for the instant's trigger and re-point reminders
    /// holding `trigger` until the scheduler hands back the one they hold.
    ///
    /// Every trigger moved away from is retired, so a scheduler that mints a
    /// fresh id per call never accumulates unreferenced triggers.
    async fn settle_trigger(
        &self,
        mut trigger: Trigger,
    ) -> std::result::Result<Trigger, CollaboratorError> {
        for _ in 0..MAX_SETTLE_ATTEMPTS {
            let current = self.scheduler.get_or_create(trigger.fire_at).await?;
            if current.id == trigger.id {
                return Ok(current);
            }
            self.repository
                .reassign_trigger(&trigger.id, &current.id)
                .await?;
            tracing::debug!(
                old_trigger_id = %trigger.id,
                trigger_id = %current.id,
                "reminders re-pointed to replacement trigger"
            );
            self.retire_trigger(&trigger).await;
            trigger = current;
        }
        tracing::debug!(trigger_id = %trigger.id, "scheduler ids did not repeat, keeping latest");
        Ok(trigger)
    }

    /// Delete a trigger that reminders were moved away from, unless a
    /// reference to it appeared in the meantime.
    ///
    /// A reminder persisted against it later settles off it on its own.
    async fn retire_trigger(&self, trigger: &Trigger) {
        match self.repository.get_live_owner_refs(&trigger.id).await {
            Ok(refs) if refs.is_empty() => {}
            Ok(_) => {
                tracing::debug!(trigger_id = %trigger.id, "replaced trigger still referenced");
                return;
            }
            Err(e) => {
                tracing::debug!(trigger_id = %trigger.id, error = %e, "could not check replaced trigger");
                return;
            }
        }
        match self.scheduler.delete(&trigger.id).await {
            Ok(()) => {
                tracing::debug!(trigger_id = %trigger.id, "replaced trigger deleted");
            }
            Err(CollaboratorError::NotFound(_)) => {}
            Err(e) => {
                tracing::warn!(
                    trigger_id = %trigger.id,
                    fire_at = %trigger.fire_at,
                    error = %e,
                    "orphaned trigger needs cleanup"
                );
            }
        }
    }

    async fn delete_reminder(&self, id: &ReminderId) -> Result<()> {
        self.repository
            .delete(id)
            .await
            .map_err(|e| ReminderError::conflict(LifecycleStage::DeleteReminder, e))
    }

    async fn live_refs(&self, trigger_id: &TriggerId) -> Result<Vec<OwnerRef>> {
        self.repository
            .get_live_owner_refs(trigger_id)
            .await
            .map_err(|e| ReminderError::conflict(LifecycleStage::QueryReferences, e))
    }

    /// Undo a persisted reminder after a later attach step failed.
    ///
    /// The reminder may have been re-pointed while settling, so both the
    /// trigger it holds now and `trigger` are reconciled.
    async fn abandon_attach(&self, reminder_id: &ReminderId, trigger: &Trigger) {
        let held = match self.repository.get(reminder_id).await {
            Ok(Some(current)) => current.trigger_id,
            _ => None,
        };
        if let Err(e) = self.repository.delete(reminder_id).await {
            tracing::warn!(%reminder_id, error = %e, "could not remove abandoned reminder");
        }
        if let Some(held) = held.filter(|id| *id != trigger.id) {
            self.compensate(&Trigger::new(held, trigger.fire_at)).await;
        }
        self.compensate(trigger).await;
    }

    /// Best-effort cleanup of a trigger after a failed attach.
    async fn compensate(&self, trigger: &Trigger) {
        match self.reconcile_trigger(trigger).await {
            Ok(ReconcileOutcome::Orphaned { cause, .. }) => {
                tracing::warn!(trigger_id = %trigger.id, cause = %cause, "compensation left an orphaned trigger");
            }
            Ok(outcome) => {
                tracing::debug!(trigger_id = %trigger.id, outcome = outcome.name(), "compensation done");
            }
            Err(e) => {
                tracing::warn!(trigger_id = %trigger.id, error = %e, "compensation failed");
            }
        }
    }
}
