//! Persistence boundary.
//!
//! The services in this crate only talk to storage through [`EntryStore`].
//! `wt-db` provides the SQLite implementation; [`MemoryStore`] keeps
//! everything in a mutex-guarded map and is what the unit tests run against.
//!
//! # Contract
//!
//! - Every method is atomic for the single row it touches.
//! - Lookups return `Ok(None)` for a missing row; `update_*` and `delete_*`
//!   return [`StoreError::NotFound`].
//! - `update_entry` only lands if the stored row still has the status the
//!   caller read; otherwise it fails with [`StoreError::Conflict`] and the
//!   row is left alone.
//! - `create_entry` rejects a second non-completed entry for the same user
//!   with [`StoreError::Conflict`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use thiserror::Error;

use crate::category::{Category, NewCategory};
use crate::entry::{NewEntry, TimeEntry};
use crate::types::{CategoryId, EntryId, EntryStatus, UserId};

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write.
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// The row to update or delete does not exist.
    #[error("record not found")]
    NotFound,

    /// Anything else the backend reported.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend-specific error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Entries and categories keyed by user.
pub trait EntryStore: Send + Sync {
    /// Persists a new entry and returns it with its assigned ID.
    fn create_entry(&self, entry: NewEntry) -> Result<TimeEntry, StoreError>;

    fn get_entry(&self, id: &EntryId) -> Result<Option<TimeEntry>, StoreError>;

    /// All entries of `user`, newest first.
    fn list_entries(&self, user: &UserId) -> Result<Vec<TimeEntry>, StoreError>;

    /// The user's single non-completed entry, if any.
    fn active_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError>;

    /// Overwrites every mutable field of the entry in one write, provided
    /// the stored status is still `expected`.
    fn update_entry(&self, entry: &TimeEntry, expected: EntryStatus) -> Result<(), StoreError>;

    fn delete_entry(&self, id: &EntryId) -> Result<(), StoreError>;

    /// Completed entries of `user` whose start date lies in `[start, end]`,
    /// newest first.
    fn list_completed_in_period(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeEntry>, StoreError>;

    fn create_category(&self, category: NewCategory) -> Result<Category, StoreError>;

    fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, StoreError>;

    /// Categories of `user` ordered by name.
    fn list_categories(&self, user: &UserId) -> Result<Vec<Category>, StoreError>;

    fn update_category(&self, category: &Category) -> Result<(), StoreError>;

    /// Removes the category and detaches it from any entries.
    fn delete_category(&self, id: &CategoryId) -> Result<(), StoreError>;
}

/// An in-process [`EntryStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<TimeEntry>,
    categories: Vec<Category>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Each mutation is a single assignment, so a poisoned lock never guards
    // a half-written row.
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn newest_first(entries: &mut [TimeEntry]) {
    entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}

impl EntryStore for MemoryStore {
    fn create_entry(&self, entry: NewEntry) -> Result<TimeEntry, StoreError> {
        let mut state = self.state();
        if state
            .entries
            .iter()
            .any(|e| e.user_id == entry.user_id && e.status.is_open())
        {
            return Err(StoreError::Conflict(format!(
                "user {} already has an open entry",
                entry.user_id
            )));
        }
        let entry = entry.into_entry(EntryId::generate());
        state.entries.push(entry.clone());
        Ok(entry)
    }

    fn get_entry(&self, id: &EntryId) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self.state().entries.iter().find(|e| &e.id == id).cloned())
    }

    fn list_entries(&self, user: &UserId) -> Result<Vec<TimeEntry>, StoreError> {
        let mut entries: Vec<_> = self
            .state()
            .entries
            .iter()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect();
        newest_first(&mut entries);
        Ok(entries)
    }

    fn active_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self
            .state()
            .entries
            .iter()
            .find(|e| &e.user_id == user && e.status.is_open())
            .cloned())
    }

    fn update_entry(&self, entry: &TimeEntry, expected: EntryStatus) -> Result<(), StoreError> {
        let mut state = self.state();
        let slot = state
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or(StoreError::NotFound)?;
        if slot.status != expected {
            return Err(StoreError::Conflict(format!(
                "entry {} is {}, expected {expected}",
                slot.id, slot.status
            )));
        }
        *slot = entry.clone();
        Ok(())
    }

    fn delete_entry(&self, id: &EntryId) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.entries.len();
        state.entries.retain(|e| &e.id != id);
        if state.entries.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn list_completed_in_period(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let mut entries: Vec<_> = self
            .state()
            .entries
            .iter()
            .filter(|e| &e.user_id == user && e.status == EntryStatus::Completed)
            .filter(|e| (start..=end).contains(&e.start_time.date_naive()))
            .cloned()
            .collect();
        newest_first(&mut entries);
        Ok(entries)
    }

    fn create_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let category = category.into_category(CategoryId::generate());
        self.state().categories.push(category.clone());
        Ok(category)
    }

    fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.state().categories.iter().find(|c| &c.id == id).cloned())
    }

    fn list_categories(&self, user: &UserId) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<_> = self
            .state()
            .categories
            .iter()
            .filter(|c| &c.user_id == user)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut state = self.state();
        let slot = state
            .categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or(StoreError::NotFound)?;
        *slot = category.clone();
        Ok(())
    }

    fn delete_category(&self, id: &CategoryId) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.categories.len();
        state.categories.retain(|c| &c.id != id);
        if state.categories.len() == before {
            return Err(StoreError::NotFound);
        }
        for entry in &mut state.entries {
            if entry.category_id.as_ref() == Some(id) {
                entry.category_id = None;
            }
        }
        Ok(())
    }
}
