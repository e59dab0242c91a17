//! Storage layer for the work-time tracker.
//!
//! Provides a SQLite-backed [`EntryStore`] for time entries and categories
//! using `rusqlite`.
//!
//! # Thread Safety
//!
//! `rusqlite::Connection` is `Send` but not `Sync`, so [`Database`] keeps its
//! connection behind a `Mutex`. That makes a `Database` shareable across
//! threads (e.g. in an `Arc`), with statements from different threads
//! serialized on the one connection. Separate processes, or separate
//! `Database` handles on the same file, coordinate through SQLite's own
//! locking and the configured busy timeout.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format with millisecond
//! precision (e.g., `2024-01-15T10:30:00.000Z`). This format ensures:
//! - Lexicographic ordering matches chronological ordering
//! - The first ten characters are the UTC calendar date, which is what
//!   period queries filter on
//! - Human-readable values in the database
//!
//! ## One Open Entry Per User
//!
//! `idx_time_entries_open_per_user` is a partial unique index over
//! `user_id` restricted to rows whose status is not `completed`. A second
//! open entry for the same user fails with a unique-constraint violation,
//! which surfaces as [`StoreError::Conflict`].
//!
//! ## Conditional Updates
//!
//! Entry updates carry the status the caller read (`WHERE id = ? AND
//! status = ?`). If another connection has moved the entry on in between,
//! no row matches and the write is reported as [`StoreError::Conflict`]
//! instead of overwriting the newer state.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Params, Row, params};
use thiserror::Error;

use wt_core::{
    Category, CategoryId, EntryId, EntryStatus, EntryStore, NewCategory, NewEntry, StoreError,
    TimeEntry, UserId,
};

/// Busy timeout applied when none is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The user already has an entry that is not completed.
    #[error("user {user_id} already has an open entry")]
    OpenEntryExists { user_id: String },
    /// The entry no longer has the status the update was based on.
    #[error("entry {entry_id} is no longer {expected}")]
    StaleEntry {
        entry_id: String,
        expected: EntryStatus,
    },
    /// The row to update or delete does not exist.
    #[error("no row with id {0}")]
    NotFound(String),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for row {row_id}: {timestamp}")]
    TimestampParse {
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value does not satisfy the domain type.
    #[error("invalid data in row {row_id}: {message}")]
    InvalidRow { row_id: String, message: String },
    /// A thread panicked while holding the connection.
    #[error("database connection lock poisoned")]
    Poisoned,
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::OpenEntryExists { .. } | DbError::StaleEntry { .. } => {
                Self::Conflict(err.to_string())
            }
            DbError::NotFound(_) => Self::NotFound,
            other => Self::backend(other),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

const ENTRY_COLUMNS: &str = "id, user_id, category_id, start_time, end_time, paused_at, \
     resumed_at, total_paused, status, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, user_id, name, color, created_at, updated_at";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens a database, waiting at most `busy_timeout` for locks held by
    /// other connections.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::init(&conn)?;
        tracing::debug!(path = %path.display(), ?busy_timeout, "opened database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(conn: &Connection) -> Result<(), DbError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

            -- Time entries: one work session each
            -- status: 'active' | 'paused' | 'completed'
            -- total_paused: whole seconds
            CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                category_id TEXT,
                start_time TEXT NOT NULL,
                end_time TEXT,
                paused_at TEXT,
                resumed_at TEXT,
                total_paused INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_user_start
                ON time_entries(user_id, start_time);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_time_entries_open_per_user
                ON time_entries(user_id) WHERE status != 'completed';
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn insert_entry(&self, entry: NewEntry) -> Result<TimeEntry, DbError> {
        let entry = entry.into_entry(EntryId::generate());
        let conn = self.conn()?;
        let result = conn.execute(
            &format!(
                "INSERT INTO time_entries ({ENTRY_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                entry.id.as_str(),
                entry.user_id.as_str(),
                entry.category_id.as_ref().map(CategoryId::as_str),
                format_timestamp(entry.start_time),
                entry.end_time.map(format_timestamp),
                entry.paused_at.map(format_timestamp),
                entry.resumed_at.map(format_timestamp),
                entry.total_paused,
                entry.status.as_str(),
                format_timestamp(entry.created_at),
                format_timestamp(entry.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(entry),
            Err(err) if is_unique_violation(&err) => Err(DbError::OpenEntryExists {
                user_id: entry.user_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn select_entry(&self, id: &EntryId) -> Result<Option<TimeEntry>, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM time_entries WHERE id = ?"),
            [id.as_str()],
            EntryRow::from_row,
        )
        .optional()?
        .map(EntryRow::into_entry)
        .transpose()
    }

    fn select_entries(&self, user: &UserId) -> Result<Vec<TimeEntry>, DbError> {
        let conn = self.conn()?;
        query_entries(
            &conn,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM time_entries
                 WHERE user_id = ?
                 ORDER BY start_time DESC, id ASC"
            ),
            [user.as_str()],
        )
    }

    fn select_open_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, DbError> {
        let conn = self.conn()?;
        let mut entries = query_entries(
            &conn,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM time_entries
                 WHERE user_id = ? AND status != 'completed'
                 LIMIT 1"
            ),
            [user.as_str()],
        )?;
        Ok(entries.pop())
    }

    fn write_entry(&self, entry: &TimeEntry, expected: EntryStatus) -> Result<(), DbError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "
            UPDATE time_entries
            SET category_id = ?, end_time = ?, paused_at = ?, resumed_at = ?,
                total_paused = ?, status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            ",
            params![
                entry.category_id.as_ref().map(CategoryId::as_str),
                entry.end_time.map(format_timestamp),
                entry.paused_at.map(format_timestamp),
                entry.resumed_at.map(format_timestamp),
                entry.total_paused,
                entry.status.as_str(),
                format_timestamp(entry.updated_at),
                entry.id.as_str(),
                expected.as_str(),
            ],
        )?;
        if changed == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM time_entries WHERE id = ?)",
                [entry.id.as_str()],
                |row| row.get(0),
            )?;
            if exists {
                return Err(DbError::StaleEntry {
                    entry_id: entry.id.to_string(),
                    expected,
                });
            }
            return Err(DbError::NotFound(entry.id.to_string()));
        }
        Ok(())
    }

    fn remove_entry(&self, id: &EntryId) -> Result<(), DbError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM time_entries WHERE id = ?", [id.as_str()])?;
        if changed == 0 {
            return Err(DbError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn select_completed_in_period(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeEntry>, DbError> {
        let conn = self.conn()?;
        query_entries(
            &conn,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM time_entries
                 WHERE user_id = ?
                   AND status = 'completed'
                   AND substr(start_time, 1, 10) BETWEEN ? AND ?
                 ORDER BY start_time DESC, id ASC"
            ),
            params![user.as_str(), format_date(start), format_date(end)],
        )
    }

    fn insert_category(&self, category: NewCategory) -> Result<Category, DbError> {
        let category = category.into_category(CategoryId::generate());
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO categories ({CATEGORY_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            params![
                category.id.as_str(),
                category.user_id.as_str(),
                category.name,
                category.color,
                format_timestamp(category.created_at),
                format_timestamp(category.updated_at),
            ],
        )?;
        Ok(category)
    }

    fn select_category(&self, id: &CategoryId) -> Result<Option<Category>, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"),
            [id.as_str()],
            CategoryRow::from_row,
        )
        .optional()?
        .map(CategoryRow::into_category)
        .transpose()
    }

    fn select_categories(&self, user: &UserId) -> Result<Vec<Category>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = ? ORDER BY name ASC"
        ))?;
        let rows = stmt.query_map([user.as_str()], CategoryRow::from_row)?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?.into_category()?);
        }
        Ok(categories)
    }

    fn write_category(&self, category: &Category) -> Result<(), DbError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE categories SET name = ?, color = ?, updated_at = ? WHERE id = ?",
            params![
                category.name,
                category.color,
                format_timestamp(category.updated_at),
                category.id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound(category.id.to_string()));
        }
        Ok(())
    }

    fn remove_category(&self, id: &CategoryId) -> Result<(), DbError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM categories WHERE id = ?", [id.as_str()])?;
        if changed == 0 {
            return Err(DbError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl EntryStore for Database {
    fn create_entry(&self, entry: NewEntry) -> Result<TimeEntry, StoreError> {
        Ok(self.insert_entry(entry)?)
    }

    fn get_entry(&self, id: &EntryId) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self.select_entry(id)?)
    }

    fn list_entries(&self, user: &UserId) -> Result<Vec<TimeEntry>, StoreError> {
        Ok(self.select_entries(user)?)
    }

    fn active_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self.select_open_entry(user)?)
    }

    fn update_entry(&self, entry: &TimeEntry, expected: EntryStatus) -> Result<(), StoreError> {
        Ok(self.write_entry(entry, expected)?)
    }

    fn delete_entry(&self, id: &EntryId) -> Result<(), StoreError> {
        Ok(self.remove_entry(id)?)
    }

    fn list_completed_in_period(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        Ok(self.select_completed_in_period(user, start, end)?)
    }

    fn create_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        Ok(self.insert_category(category)?)
    }

    fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.select_category(id)?)
    }

    fn list_categories(&self, user: &UserId) -> Result<Vec<Category>, StoreError> {
        Ok(self.select_categories(user)?)
    }

    fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        Ok(self.write_category(category)?)
    }

    fn delete_category(&self, id: &CategoryId) -> Result<(), StoreError> {
        Ok(self.remove_category(id)?)
    }
}

#[derive(Debug)]
struct EntryRow {
    id: String,
    user_id: String,
    category_id: Option<String>,
    start_time: String,
    end_time: Option<String>,
    paused_at: Option<String>,
    resumed_at: Option<String>,
    total_paused: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            category_id: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            paused_at: row.get(5)?,
            resumed_at: row.get(6)?,
            total_paused: row.get(7)?,
            status: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_entry(self) -> Result<TimeEntry, DbError> {
        let row_id = self.id.as_str();
        let parse_opt = |value: Option<&String>| {
            value
                .map(|timestamp| parse_timestamp(timestamp, row_id))
                .transpose()
        };
        Ok(TimeEntry {
            start_time: parse_timestamp(&self.start_time, row_id)?,
            end_time: parse_opt(self.end_time.as_ref())?,
            paused_at: parse_opt(self.paused_at.as_ref())?,
            resumed_at: parse_opt(self.resumed_at.as_ref())?,
            created_at: parse_timestamp(&self.created_at, row_id)?,
            updated_at: parse_timestamp(&self.updated_at, row_id)?,
            status: self
                .status
                .parse::<EntryStatus>()
                .map_err(|err| invalid_row(row_id, &err))?,
            user_id: UserId::new(self.user_id).map_err(|err| invalid_row(row_id, &err))?,
            category_id: self
                .category_id
                .map(CategoryId::new)
                .transpose()
                .map_err(|err| invalid_row(row_id, &err))?,
            total_paused: self.total_paused,
            id: EntryId::new(self.id.clone()).map_err(|err| invalid_row(row_id, &err))?,
        })
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: String,
    user_id: String,
    name: String,
    color: String,
    created_at: String,
    updated_at: String,
}

impl CategoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            color: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_category(self) -> Result<Category, DbError> {
        let row_id = self.id.as_str();
        Ok(Category {
            created_at: parse_timestamp(&self.created_at, row_id)?,
            updated_at: parse_timestamp(&self.updated_at, row_id)?,
            user_id: UserId::new(self.user_id).map_err(|err| invalid_row(row_id, &err))?,
            id: CategoryId::new(self.id.clone()).map_err(|err| invalid_row(row_id, &err))?,
            name: self.name,
            color: self.color,
        })
    }
}

fn query_entries<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<TimeEntry>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, EntryRow::from_row)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.into_entry()?);
    }
    Ok(entries)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn invalid_row(row_id: &str, err: &impl std::fmt::Display) -> DbError {
    DbError::InvalidRow {
        row_id: row_id.to_string(),
        message: err.to_string(),
    }
}

fn parse_timestamp(timestamp: &str, row_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row_id: row_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
