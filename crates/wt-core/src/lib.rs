//! Core domain logic for the work-time tracker.
//!
//! This crate contains:
//! - Entries: the time-entry model and the single duration calculation
//! - Engine: the start/pause/resume/stop state machine
//! - Statistics: per-day totals, longest session and averages over periods
//! - Categories: user-owned labels with ownership checks
//! - Store: the persistence trait and an in-memory implementation

pub mod category;
pub mod clock;
mod engine;
pub mod entry;
mod error;
pub mod stats;
pub mod store;
pub mod types;

pub use category::{Categories, Category, DEFAULT_COLOR, NewCategory};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::TimeTracker;
pub use entry::{NewEntry, TimeEntry, duration_seconds};
pub use error::{ErrorKind, TrackerError};
pub use stats::{Statistics, TimeStats, compute_stats, format_duration};
pub use store::{EntryStore, MemoryStore, StoreError};
pub use types::{CategoryId, EntryId, EntryStatus, UserId, ValidationError};
