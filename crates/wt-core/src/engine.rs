//! The time-entry state machine.
//!
//! ```text
//!   active --pause--> paused --resume--> active
//!   active --stop---> completed
//!   paused --stop---> completed
//! ```
//!
//! Each user has at most one entry outside `completed`. Transitions for one
//! user are serialized by a per-user lock held across the read, the guard
//! check and the write. Writers outside this process are held off by the
//! store: a second open entry is rejected on insert, and a transition only
//! lands if the entry still has the status it was read with.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::clock::Clock;
use crate::entry::{NewEntry, TimeEntry};
use crate::error::TrackerError;
use crate::store::{EntryStore, StoreError};
use crate::types::{CategoryId, EntryId, EntryStatus, UserId};

/// Start, pause, resume, stop and delete time entries.
#[derive(Debug)]
pub struct TimeTracker<S: EntryStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
}

impl<S: EntryStore + ?Sized> TimeTracker<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: UserLocks::default(),
        }
    }

    /// Current instant according to the tracker's clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Returns the user's open (active or paused) entry.
    pub fn get_active(&self, user: &UserId) -> Result<Option<TimeEntry>, TrackerError> {
        Ok(self.store.active_entry(user)?)
    }

    /// Every entry of the user, newest first.
    pub fn entries(&self, user: &UserId) -> Result<Vec<TimeEntry>, TrackerError> {
        Ok(self.store.list_entries(user)?)
    }

    /// Opens a new entry, optionally under one of the user's categories.
    pub fn start(
        &self,
        user: &UserId,
        category: Option<&CategoryId>,
    ) -> Result<TimeEntry, TrackerError> {
        let lock = self.locks.for_user(user);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(open) = self.store.active_entry(user)? {
            return Err(TrackerError::ActiveEntryExists {
                entry_id: Some(open.id),
            });
        }

        if let Some(category_id) = category {
            let category = self
                .store
                .get_category(category_id)?
                .ok_or_else(|| TrackerError::CategoryNotFound(category_id.clone()))?;
            if &category.user_id != user {
                return Err(TrackerError::CategoryNotOwned(category_id.clone()));
            }
        }

        let new = NewEntry {
            user_id: user.clone(),
            category_id: category.cloned(),
            start_time: self.clock.now(),
        };
        let entry = match self.store.create_entry(new) {
            Ok(entry) => entry,
            Err(StoreError::Conflict(reason)) => {
                tracing::warn!(user = %user, %reason, "store rejected second open entry");
                return Err(TrackerError::ActiveEntryExists { entry_id: None });
            }
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(user = %user, entry = %entry.id, "started entry");
        Ok(entry)
    }

    /// Pauses the running entry. Its duration stops growing until resumed.
    pub fn pause(&self, user: &UserId) -> Result<TimeEntry, TrackerError> {
        self.transition(user, |entry, now| match entry.status {
            EntryStatus::Active => {
                entry.begin_pause(now);
                Ok(())
            }
            _ => Err(TrackerError::EntryAlreadyPaused {
                entry_id: entry.id.clone(),
            }),
        })
    }

    /// Resumes the paused entry, adding the pause length to `total_paused`.
    pub fn resume(&self, user: &UserId) -> Result<TimeEntry, TrackerError> {
        self.transition(user, |entry, now| match entry.status {
            EntryStatus::Paused => {
                entry.resume(now);
                Ok(())
            }
            _ => Err(TrackerError::EntryNotPaused {
                entry_id: entry.id.clone(),
            }),
        })
    }

    /// Completes the open entry, whether running or paused.
    pub fn stop(&self, user: &UserId) -> Result<TimeEntry, TrackerError> {
        self.transition(user, |entry, now| {
            entry.complete(now);
            Ok(())
        })
    }

    /// Permanently removes one of the user's entries, whatever its status.
    pub fn delete(&self, entry_id: &EntryId, user: &UserId) -> Result<(), TrackerError> {
        let lock = self.locks.for_user(user);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = self
            .store
            .get_entry(entry_id)?
            .ok_or_else(|| TrackerError::EntryNotFound(entry_id.clone()))?;
        if &entry.user_id != user {
            return Err(TrackerError::NotAuthorized);
        }

        match self.store.delete_entry(entry_id) {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                return Err(TrackerError::EntryNotFound(entry_id.clone()));
            }
            Err(err) => return Err(err.into()),
        }
        tracing::debug!(user = %user, entry = %entry_id, "deleted entry");
        Ok(())
    }

    /// Applies `apply` to the user's open entry under the user's lock and
    /// persists the result with a single write.
    fn transition<F>(&self, user: &UserId, apply: F) -> Result<TimeEntry, TrackerError>
    where
        F: FnOnce(&mut TimeEntry, chrono::DateTime<chrono::Utc>) -> Result<(), TrackerError>,
    {
        let lock = self.locks.for_user(user);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entry = self
            .store
            .active_entry(user)?
            .ok_or(TrackerError::NoActiveEntry)?;
        let from = entry.status;
        apply(&mut entry, self.clock.now())?;
        match self.store.update_entry(&entry, from) {
            Ok(()) => {}
            Err(StoreError::Conflict(reason)) => {
                tracing::warn!(
                    user = %user,
                    entry = %entry.id,
                    %reason,
                    "stale transition rejected"
                );
                return Err(TrackerError::EntryChanged { entry_id: entry.id });
            }
            Err(err) => return Err(err.into()),
        }

        tracing::debug!(
            user = %user,
            entry = %entry.id,
            from = %from,
            to = %entry.status,
            "entry transitioned"
        );
        Ok(entry)
    }
}

/// One mutex per user, created on first use and never evicted, so the map
/// grows with the number of distinct users a tracker has seen.
#[derive(Debug, Default)]
struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    fn for_user(&self, user: &UserId) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(user.clone()).or_default())
    }
}
