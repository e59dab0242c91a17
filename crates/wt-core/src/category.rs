//! Categories: user-owned labels for time entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::TrackerError;
use crate::store::EntryStore;
use crate::types::{CategoryId, UserId};

/// Color assigned when a category is created without one.
pub const DEFAULT_COLOR: &str = "#4a6bff";

/// A label for grouping entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields a caller supplies when creating a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub user_id: UserId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl NewCategory {
    /// Materializes the category under the given ID.
    #[must_use]
    pub fn into_category(self, id: CategoryId) -> Category {
        Category {
            id,
            user_id: self.user_id,
            name: self.name,
            color: self.color,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Category CRUD with ownership checks.
#[derive(Debug)]
pub struct Categories<S: EntryStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: EntryStore + ?Sized> Categories<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a category. A blank `color` falls back to [`DEFAULT_COLOR`].
    pub fn create(
        &self,
        user: &UserId,
        name: &str,
        color: Option<&str>,
    ) -> Result<Category, TrackerError> {
        let name = validate_name(name)?;
        let color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COLOR);

        let category = self.store.create_category(NewCategory {
            user_id: user.clone(),
            name,
            color: color.to_string(),
            created_at: self.clock.now(),
        })?;
        tracing::debug!(user = %user, category = %category.id, "created category");
        Ok(category)
    }

    /// Lists the user's categories ordered by name.
    pub fn list(&self, user: &UserId) -> Result<Vec<Category>, TrackerError> {
        Ok(self.store.list_categories(user)?)
    }

    /// Fetches one of the user's categories.
    pub fn get(&self, id: &CategoryId, user: &UserId) -> Result<Category, TrackerError> {
        self.owned(id, user)
    }

    /// Renames a category. A blank `color` keeps the current one.
    pub fn update(
        &self,
        id: &CategoryId,
        user: &UserId,
        name: &str,
        color: Option<&str>,
    ) -> Result<Category, TrackerError> {
        let mut category = self.owned(id, user)?;
        category.name = validate_name(name)?;
        if let Some(color) = color.map(str::trim).filter(|c| !c.is_empty()) {
            color.clone_into(&mut category.color);
        }
        category.updated_at = self.clock.now();

        self.store.update_category(&category)?;
        tracing::debug!(user = %user, category = %category.id, "updated category");
        Ok(category)
    }

    /// Deletes a category. Entries that referenced it keep existing without one.
    pub fn delete(&self, id: &CategoryId, user: &UserId) -> Result<(), TrackerError> {
        self.owned(id, user)?;
        self.store.delete_category(id)?;
        tracing::debug!(user = %user, category = %id, "deleted category");
        Ok(())
    }

    fn owned(&self, id: &CategoryId, user: &UserId) -> Result<Category, TrackerError> {
        let category = self
            .store
            .get_category(id)?
            .ok_or_else(|| TrackerError::CategoryNotFound(id.clone()))?;
        if &category.user_id != user {
            return Err(TrackerError::NotAuthorized);
        }
        Ok(category)
    }
}

fn validate_name(name: &str) -> Result<String, TrackerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::InvalidCategoryName);
    }
    Ok(name.to_string())
}
