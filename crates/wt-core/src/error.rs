//! Error taxonomy for tracker operations.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::{CategoryId, EntryId, ValidationError};

/// Failures returned by [`TimeTracker`](crate::TimeTracker),
/// [`Statistics`](crate::Statistics) and [`Categories`](crate::Categories).
///
/// Guard violations are detected before anything is written. Nothing is
/// retried: a caller that gets `ActiveEntryExists` decides what to do next.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// `start` while the user already has an open entry.
    #[error("an entry is already running")]
    ActiveEntryExists { entry_id: Option<EntryId> },

    /// `pause`, `resume` or `stop` with nothing open.
    #[error("no entry is running")]
    NoActiveEntry,

    /// `pause` on an entry that is already paused.
    #[error("entry {entry_id} is already paused")]
    EntryAlreadyPaused { entry_id: EntryId },

    /// `resume` on an entry that is running.
    #[error("entry {entry_id} is not paused")]
    EntryNotPaused { entry_id: EntryId },

    /// Another writer moved the entry on between our read and our write.
    /// Nothing was written; read the entry again before retrying.
    #[error("entry {entry_id} was changed by another writer")]
    EntryChanged { entry_id: EntryId },

    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// The target exists but belongs to another user.
    #[error("not authorized to modify this resource")]
    NotAuthorized,

    /// `start` referenced a category owned by another user.
    #[error("category {0} does not belong to this user")]
    CategoryNotOwned(CategoryId),

    #[error("category name cannot be empty")]
    InvalidCategoryName,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed; the cause is kept as the source.
    #[error("store failure")]
    Store(#[from] StoreError),
}

/// Coarse classification of a [`TrackerError`], for callers that map
/// failures onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    Forbidden,
    Invalid,
    Internal,
}

impl TrackerError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ActiveEntryExists { .. }
            | Self::NoActiveEntry
            | Self::EntryAlreadyPaused { .. }
            | Self::EntryNotPaused { .. }
            | Self::EntryChanged { .. } => ErrorKind::Conflict,
            Self::EntryNotFound(_) | Self::CategoryNotFound(_) => ErrorKind::NotFound,
            Self::NotAuthorized | Self::CategoryNotOwned(_) => ErrorKind::Forbidden,
            Self::InvalidCategoryName | Self::Validation(_) => ErrorKind::Invalid,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}
