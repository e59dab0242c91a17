//! Services the commands run against.

use std::sync::Arc;

use anyhow::{Context, Result};

use wt_core::{
    Categories, Clock, ErrorKind, Statistics, SystemClock, TimeTracker, TrackerError, UserId,
};
use wt_db::Database;

use crate::Config;

/// The tracker, statistics and category services over one database, bound
/// to the user the command runs as.
#[derive(Debug)]
pub struct App {
    pub user: UserId,
    pub tracker: TimeTracker<Database>,
    pub stats: Statistics<Database>,
    pub categories: Categories<Database>,
}

impl App {
    pub fn new(db: Database, clock: Arc<dyn Clock>, user: UserId) -> Self {
        let db = Arc::new(db);
        Self {
            user,
            tracker: TimeTracker::new(Arc::clone(&db), Arc::clone(&clock)),
            stats: Statistics::new(Arc::clone(&db), Arc::clone(&clock)),
            categories: Categories::new(db, clock),
        }
    }

    /// Opens the configured database, creating its directory if needed.
    ///
    /// `user` overrides the configured user.
    pub fn open(config: &Config, user: Option<&str>) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create database directory")?;
        }

        let db = Database::open_with_timeout(&config.database_path, config.busy_timeout())
            .with_context(|| format!("failed to open {}", config.database_path.display()))?;
        let user = UserId::new(user.unwrap_or(&config.user))
            .map_err(TrackerError::from)
            .context("invalid user")?;
        tracing::debug!(user = %user, "opened tracker");

        Ok(Self::new(db, Arc::new(SystemClock), user))
    }
}

/// Process exit code for a failed command.
///
/// Tracker failures are classified by [`TrackerError::kind`]; anything else
/// exits with 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TrackerError>().map(TrackerError::kind) {
        Some(ErrorKind::Invalid) => 2,
        Some(ErrorKind::Conflict) => 3,
        Some(ErrorKind::NotFound) => 4,
        Some(ErrorKind::Forbidden) => 5,
        Some(ErrorKind::Internal) | None => 1,
    }
}
