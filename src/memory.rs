//! In-memory implementations of [`TriggerScheduler`] and [`ReminderRepository`].
//!
//! Used by tests and the diagnostic binary to exercise the lifecycle
//! protocol without a database or job scheduler. Both support failure
//! injection; the scheduler can also run an async hook inside `delete`
//! to reproduce an attach racing a trigger deletion deterministically.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CollaboratorError;
use crate::lifecycle::{ReminderRepository, TriggerScheduler};
use crate::model::{NewReminder, OwnerRef, Reminder, ReminderId, Trigger, TriggerId};

type DeleteHook = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

fn poisoned() -> CollaboratorError {
    CollaboratorError::Backend("in-memory lock poisoned".to_owned())
}

// ─── InMemoryTriggerScheduler ─────────────────────────────────────────────────

#[derive(Default)]
struct SchedulerState {
    triggers: BTreeMap<TriggerId, DateTime<Utc>>,
    next_id: u64,
}

/// A trigger scheduler that keeps triggers in a map.
///
/// Ids are `trigger-1`, `trigger-2`, ... and never reused, so a trigger
/// recreated after a delete gets a new id. With [`mint_fresh_ids`] every
/// `get_or_create` call creates another trigger, which the scheduler
/// contract also permits.
///
/// [`mint_fresh_ids`]: InMemoryTriggerScheduler::mint_fresh_ids
#[derive(Default)]
pub struct InMemoryTriggerScheduler {
    state: Mutex<SchedulerState>,
    fail_creates: AtomicBool,
    fail_deletes: AtomicBool,
    fresh_ids: AtomicBool,
    delete_hook: Mutex<Option<DeleteHook>>,
}

impl InMemoryTriggerScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `get_or_create` fail while `enabled`.
    pub fn fail_creates(&self, enabled: bool) {
        self.fail_creates.store(enabled, Ordering::SeqCst);
    }

    /// Make `delete` fail while `enabled`.
    pub fn fail_deletes(&self, enabled: bool) {
        self.fail_deletes.store(enabled, Ordering::SeqCst);
    }

    /// Create a new trigger on every `get_or_create` while `enabled`,
    /// instead of returning the live one for the instant.
    pub fn mint_fresh_ids(&self, enabled: bool) {
        self.fresh_ids.store(enabled, Ordering::SeqCst);
    }

    /// Run `hook` to completion inside the next `delete`, before the
    /// trigger is removed. The hook runs once.
    pub fn set_delete_hook(&self, hook: impl Future<Output = ()> + Send + 'static) {
        if let Ok(mut slot) = self.delete_hook.lock() {
            *slot = Some(Box::pin(hook));
        }
    }

    /// All live triggers, ordered by id.
    pub fn live_triggers(&self) -> Vec<Trigger> {
        self.state
            .lock()
            .map(|state| {
                state
                    .triggers
                    .iter()
                    .map(|(id, fire_at)| Trigger::new(id.clone(), *fire_at))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The live trigger for `fire_at`, if any.
    pub fn trigger_at(&self, fire_at: DateTime<Utc>) -> Option<Trigger> {
        self.live_triggers()
            .into_iter()
            .find(|t| t.fire_at == fire_at)
    }

    /// Whether `trigger_id` is live.
    pub fn contains(&self, trigger_id: &TriggerId) -> bool {
        self.state
            .lock()
            .map(|state| state.triggers.contains_key(trigger_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl TriggerScheduler for InMemoryTriggerScheduler {
    async fn get_or_create(&self, fire_at: DateTime<Utc>) -> Result<Trigger, CollaboratorError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "scheduler rejected trigger creation".to_owned(),
            ));
        }
        let fresh = self.fresh_ids.load(Ordering::SeqCst);
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if !fresh && let Some((id, _)) = state.triggers.iter().find(|(_, at)| **at == fire_at) {
            return Ok(Trigger::new(id.clone(), fire_at));
        }
        state.next_id += 1;
        let id = TriggerId::new(format!("trigger-{}", state.next_id));
        state.triggers.insert(id.clone(), fire_at);
        Ok(Trigger::new(id, fire_at))
    }

    async fn delete(&self, trigger_id: &TriggerId) -> Result<(), CollaboratorError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Backend(format!(
                "scheduler refused to delete {trigger_id}"
            )));
        }

        let hook = self.delete_hook.lock().map_err(|_| poisoned())?.take();
        if let Some(hook) = hook {
            hook.await;
        }

        let mut state = self.state.lock().map_err(|_| poisoned())?;
        match state.triggers.remove(trigger_id) {
            Some(_) => Ok(()),
            None => Err(CollaboratorError::NotFound(trigger_id.to_string())),
        }
    }
}

// ─── InMemoryReminderRepository ───────────────────────────────────────────────

#[derive(Default)]
struct RepositoryState {
    reminders: BTreeMap<ReminderId, Reminder>,
    links: BTreeMap<ReminderId, BTreeSet<OwnerRef>>,
}

/// A reminder repository backed by maps.
///
/// Deletes are soft: reminders stay readable with `deleted_at` set.
#[derive(Default)]
pub struct InMemoryReminderRepository {
    state: Mutex<RepositoryState>,
    fail_persists: AtomicBool,
    fail_links: AtomicBool,
    read_budget: Mutex<Option<usize>>,
}

impl InMemoryReminderRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create` fail while `enabled`.
    pub fn fail_persists(&self, enabled: bool) {
        self.fail_persists.store(enabled, Ordering::SeqCst);
    }

    /// Make `link_to_owner` fail while `enabled`.
    pub fn fail_links(&self, enabled: bool) {
        self.fail_links.store(enabled, Ordering::SeqCst);
    }

    /// Let `successes` more `get` calls through, then fail every one after.
    /// `None` lifts the limit.
    pub fn fail_gets_after(&self, successes: Option<usize>) {
        if let Ok(mut budget) = self.read_budget.lock() {
            *budget = successes;
        }
    }

    fn spend_read(&self) -> Result<(), CollaboratorError> {
        let mut budget = self.read_budget.lock().map_err(|_| poisoned())?;
        match budget.as_mut() {
            Some(0) => Err(CollaboratorError::Unavailable(
                "repository read failed".to_owned(),
            )),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Every stored reminder, including soft-deleted ones.
    pub fn reminders(&self) -> Vec<Reminder> {
        self.state
            .lock()
            .map(|state| state.reminders.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Reminders that have not been soft-deleted.
    pub fn live_reminders(&self) -> Vec<Reminder> {
        self.reminders().into_iter().filter(Reminder::is_live).collect()
    }
}

#[async_trait]
impl ReminderRepository for InMemoryReminderRepository {
    async fn create(&self, reminder: Reminder) -> Result<Reminder, CollaboratorError> {
        if self.fail_persists.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Backend(
                "repository rejected reminder".to_owned(),
            ));
        }
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.reminders.insert(reminder.id.clone(), reminder.clone());
        Ok(reminder)
    }

    async fn get(&self, id: &ReminderId) -> Result<Option<Reminder>, CollaboratorError> {
        self.spend_read()?;
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.reminders.get(id).cloned())
    }

    async fn link_to_owner(
        &self,
        id: &ReminderId,
        owner: &OwnerRef,
    ) -> Result<(), CollaboratorError> {
        if self.fail_links.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Backend(format!(
                "repository rejected link {owner}"
            )));
        }
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if !state.reminders.contains_key(id) {
            return Err(CollaboratorError::NotFound(id.to_string()));
        }
        state
            .links
            .entry(id.clone())
            .or_default()
            .insert(owner.clone());
        Ok(())
    }

    async fn unlink_from_owner(
        &self,
        id: &ReminderId,
        owner: &OwnerRef,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if let Some(links) = state.links.get_mut(id) {
            links.remove(owner);
        }
        Ok(())
    }

    async fn linked_owners(&self, id: &ReminderId) -> Result<Vec<OwnerRef>, CollaboratorError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .links
            .get(id)
            .map(|links| links.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_live_owner_refs(
        &self,
        trigger_id: &TriggerId,
    ) -> Result<Vec<OwnerRef>, CollaboratorError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        let refs = state
            .reminders
            .values()
            .filter(|r| r.is_live() && r.trigger_id.as_ref() == Some(trigger_id))
            .flat_map(|r| match state.links.get(&r.id) {
                Some(links) if !links.is_empty() => links.iter().cloned().collect::<Vec<_>>(),
                _ => vec![OwnerRef::Standalone(r.id.clone())],
            })
            .collect();
        Ok(refs)
    }

    async fn delete(&self, id: &ReminderId) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let reminder = state
            .reminders
            .get_mut(id)
            .ok_or_else(|| CollaboratorError::NotFound(id.to_string()))?;
        reminder.soft_delete(Utc::now());
        Ok(())
    }

    async fn find_reusable(
        &self,
        request: &NewReminder,
    ) -> Result<Option<Reminder>, CollaboratorError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .reminders
            .values()
            .find(|r| r.matches(request))
            .cloned())
    }

    async fn trigger_for_instant(
        &self,
        fire_at: DateTime<Utc>,
    ) -> Result<Option<TriggerId>, CollaboratorError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .reminders
            .values()
            .filter(|r| r.is_live() && r.fire_at == fire_at)
            .find_map(|r| r.trigger_id.clone()))
    }

    async fn reassign_trigger(
        &self,
        from: &TriggerId,
        to: &TriggerId,
    ) -> Result<(), CollaboratorError> {
        let now = Utc::now();
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        for reminder in state
            .reminders
            .values_mut()
            .filter(|r| r.is_live() && r.trigger_id.as_ref() == Some(from))
        {
            reminder.trigger_id = Some(to.clone());
            reminder.updated_at = now;
        }
        Ok(())
    }
}
