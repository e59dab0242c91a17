//! Entry lifecycle commands: start, pause, resume, stop and delete.

use std::io::Write;

use anyhow::{Context, Result};

use wt_core::{CategoryId, EntryId, TrackerError, format_duration};

use super::util::format_timestamp;
use crate::App;
use crate::cli::StartArgs;

pub fn start<W: Write>(writer: &mut W, app: &App, args: &StartArgs) -> Result<()> {
    let category = args
        .category
        .as_deref()
        .map(CategoryId::new)
        .transpose()
        .map_err(TrackerError::from)
        .context("invalid category ID")?;

    let entry = app.tracker.start(&app.user, category.as_ref())?;
    write!(
        writer,
        "Started entry {} at {}",
        entry.id,
        format_timestamp(entry.start_time)
    )?;
    if let Some(category) = &entry.category_id {
        write!(writer, " under category {category}")?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn pause<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    let entry = app.tracker.pause(&app.user)?;
    writeln!(
        writer,
        "Paused entry {} after {}",
        entry.id,
        format_duration(entry.duration(app.tracker.now()))
    )?;
    Ok(())
}

pub fn resume<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    let entry = app.tracker.resume(&app.user)?;
    writeln!(
        writer,
        "Resumed entry {} (paused {} so far)",
        entry.id,
        format_duration(entry.total_paused)
    )?;
    Ok(())
}

pub fn stop<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    let entry = app.tracker.stop(&app.user)?;
    writeln!(
        writer,
        "Stopped entry {}: worked {}, paused {}",
        entry.id,
        format_duration(entry.duration(app.tracker.now())),
        format_duration(entry.total_paused)
    )?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, app: &App, entry_id: &str) -> Result<()> {
    let entry_id = EntryId::new(entry_id)
        .map_err(TrackerError::from)
        .context("invalid entry ID")?;
    app.tracker.delete(&entry_id, &app.user)?;
    writeln!(writer, "Deleted entry {entry_id}")?;
    Ok(())
}
