//! Status command for showing the open entry.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use wt_core::{EntryStatus, TimeEntry, format_duration};

use super::util::format_timestamp;
use crate::App;

#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    user: &'a str,
    entry: Option<&'a TimeEntry>,
    duration: Option<i64>,
}

pub fn run<W: Write>(writer: &mut W, app: &App, json: bool) -> Result<()> {
    let active = app.tracker.get_active(&app.user)?;
    let now = app.tracker.now();
    let duration = active.as_ref().map(|entry| entry.duration(now));

    if json {
        let output = StatusOutput {
            user: app.user.as_str(),
            entry: active.as_ref(),
            duration,
        };
        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)?;
        return Ok(());
    }

    let (Some(entry), Some(duration)) = (active, duration) else {
        writeln!(writer, "No entry is running.")?;
        return Ok(());
    };

    let state = match entry.status {
        EntryStatus::Paused => "Paused",
        _ => "Running",
    };
    writeln!(writer, "{state}: entry {}", entry.id)?;
    writeln!(writer, "Started: {}", format_timestamp(entry.start_time))?;
    if let Some(paused_at) = entry.paused_at {
        writeln!(writer, "Paused at: {}", format_timestamp(paused_at))?;
    }
    if let Some(category) = &entry.category_id {
        writeln!(writer, "Category: {category}")?;
    }
    writeln!(writer, "Elapsed: {}", format_duration(duration))?;
    Ok(())
}
