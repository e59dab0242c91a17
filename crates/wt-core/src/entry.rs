//! Time entries and the duration primitive.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, EntryId, EntryStatus, UserId};

/// One work session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Store-assigned identifier.
    pub id: EntryId,

    /// Owner. All queries and mutations are scoped by this.
    pub user_id: UserId,

    /// Optional category owned by the same user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// When the session started. Never changes after creation.
    pub start_time: DateTime<Utc>,

    /// Set exactly when `status` is `Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Set exactly when `status` is `Paused`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,

    /// Last resume, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_at: Option<DateTime<Utc>>,

    /// Accumulated paused time in whole seconds.
    #[serde(default)]
    pub total_paused: i64,

    pub status: EntryStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// The fields a caller supplies when creating an entry.
///
/// The store assigns the ID; the entry starts `Active` with nothing paused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub user_id: UserId,
    pub category_id: Option<CategoryId>,
    pub start_time: DateTime<Utc>,
}

impl NewEntry {
    /// Materializes the entry under the given ID.
    #[must_use]
    pub fn into_entry(self, id: EntryId) -> TimeEntry {
        TimeEntry {
            id,
            user_id: self.user_id,
            category_id: self.category_id,
            start_time: self.start_time,
            end_time: None,
            paused_at: None,
            resumed_at: None,
            total_paused: 0,
            status: EntryStatus::Active,
            created_at: self.start_time,
            updated_at: self.start_time,
        }
    }
}

impl TimeEntry {
    /// Worked seconds as of `now`. See [`duration_seconds`].
    #[must_use]
    pub fn duration(&self, now: DateTime<Utc>) -> i64 {
        duration_seconds(self, now)
    }

    /// Moves an active entry into the paused state.
    pub(crate) fn begin_pause(&mut self, now: DateTime<Utc>) {
        self.paused_at = Some(now);
        self.status = EntryStatus::Paused;
        self.updated_at = now;
    }

    /// Folds the pause interval that ends at `now` into `total_paused`.
    ///
    /// The interval is truncated toward zero and is not clamped, so a clock
    /// that moved backwards shows up as a negative contribution.
    pub(crate) fn fold_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused += (now - paused_at).num_seconds();
        }
        self.updated_at = now;
    }

    /// Resumes a paused entry.
    pub(crate) fn resume(&mut self, now: DateTime<Utc>) {
        self.fold_pause(now);
        self.resumed_at = Some(now);
        self.status = EntryStatus::Active;
    }

    /// Closes the entry, folding any pause that is still running.
    pub(crate) fn complete(&mut self, now: DateTime<Utc>) {
        if self.status == EntryStatus::Paused {
            self.fold_pause(now);
        }
        self.end_time = Some(now);
        self.status = EntryStatus::Completed;
        self.updated_at = now;
    }
}

/// Worked seconds of `entry`, measured against `now` only while it is active.
///
/// The end of the measured span is `end_time` when set, `paused_at` while
/// paused (the duration freezes), and `now` otherwise. The span is floored to
/// whole seconds and `total_paused` is subtracted. Negative results are
/// returned unchanged: they mean the stored entry is inconsistent.
#[must_use]
pub fn duration_seconds(entry: &TimeEntry, now: DateTime<Utc>) -> i64 {
    let basis = match (entry.end_time, entry.status) {
        (Some(end), _) => end,
        (None, EntryStatus::Paused) => entry.paused_at.unwrap_or(now),
        (None, _) => now,
    };
    floor_seconds(basis - entry.start_time) - entry.total_paused
}

fn floor_seconds(span: Duration) -> i64 {
    let whole = span.num_seconds();
    if span < Duration::seconds(whole) {
        whole - 1
    } else {
        whole
    }
}
