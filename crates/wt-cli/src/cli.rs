//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Work-time tracker.
///
/// Records work sessions with start, pause, resume and stop, and reports
/// per-day totals over a week, a month or any date range.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Track time as this user instead of the configured one.
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a new entry.
    Start(StartArgs),

    /// Pause the running entry.
    Pause,

    /// Resume the paused entry.
    Resume,

    /// Stop the open entry.
    Stop,

    /// Delete an entry permanently.
    Delete {
        /// ID of the entry to delete.
        entry_id: String,
    },

    /// Show the open entry and its elapsed time.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List every entry, newest first.
    Log {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show totals for a period (the last seven days by default).
    Stats(StatsArgs),

    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryAction),
}

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Category ID to file the entry under.
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// The last seven days through today.
    #[arg(long, conflicts_with_all = ["month", "from"])]
    pub week: bool,

    /// The last calendar month through today.
    #[arg(long, conflicts_with = "from")]
    pub month: bool,

    /// First day of the period (YYYY-MM-DD, "today" or "N days ago").
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Last day of the period, inclusive.
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Category subcommands.
#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    /// Create a category.
    Add {
        name: String,

        /// Display color, e.g. "#ff8800".
        #[arg(long)]
        color: Option<String>,
    },

    /// List categories by name.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rename a category or change its color.
    Update {
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a category. Its entries are kept.
    Delete { id: String },
}
