//! Log command for listing entries.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use wt_core::{TimeEntry, format_duration};

use super::util::format_timestamp;
use crate::App;

#[derive(Debug, Serialize)]
struct LogRow<'a> {
    #[serde(flatten)]
    entry: &'a TimeEntry,
    duration: i64,
}

pub fn run<W: Write>(writer: &mut W, app: &App, json: bool) -> Result<()> {
    let entries = app.tracker.entries(&app.user)?;
    let now = app.tracker.now();

    if json {
        let rows: Vec<_> = entries
            .iter()
            .map(|entry| LogRow {
                entry,
                duration: entry.duration(now),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *writer, &rows)?;
        writeln!(writer)?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "No entries recorded.")?;
        return Ok(());
    }

    for entry in &entries {
        let end = entry
            .end_time
            .map_or_else(|| "-".to_string(), format_timestamp);
        writeln!(
            writer,
            "{}  {}  {:<19}  {:<9}  {}",
            entry.id,
            format_timestamp(entry.start_time),
            end,
            entry.status,
            format_duration(entry.duration(now))
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use insta::assert_snapshot;
    use wt_core::{ManualClock, UserId};
    use wt_db::Database;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn log_lists_newest_first() {
        let clock = Arc::new(ManualClock::new(t0()));
        let app = App::new(
            Database::open_in_memory().unwrap(),
            clock.clone(),
            UserId::new("alice").unwrap(),
        );

        let first = app.tracker.start(&app.user, None).unwrap();
        clock.set(t0() + Duration::hours(2));
        app.tracker.stop(&app.user).unwrap();
        clock.set(t0() + Duration::hours(3));
        let second = app.tracker.start(&app.user, None).unwrap();
        clock.set(t0() + Duration::minutes(200));

        let mut output = Vec::new();
        run(&mut output, &app, false).unwrap();

        let output = String::from_utf8(output)
            .unwrap()
            .replace(first.id.as_str(), "[FIRST]")
            .replace(second.id.as_str(), "[SECOND]");
        assert_snapshot!(output, @r"
        [SECOND]  2025-01-06 12:00:00  -                    active     00:20:00
        [FIRST]  2025-01-06 09:00:00  2025-01-06 11:00:00  completed  02:00:00
        ");
    }

    #[test]
    fn log_json_adds_durations() {
        let clock = Arc::new(ManualClock::new(t0()));
        let app = App::new(
            Database::open_in_memory().unwrap(),
            clock.clone(),
            UserId::new("alice").unwrap(),
        );
        app.tracker.start(&app.user, None).unwrap();
        clock.set(t0() + Duration::minutes(5));

        let mut output = Vec::new();
        run(&mut output, &app, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(1));
        assert_eq!(value[0]["duration"], 300);
        assert_eq!(value[0]["status"], "active");
    }

    #[test]
    fn log_without_entries() {
        let app = App::new(
            Database::open_in_memory().unwrap(),
            Arc::new(ManualClock::new(t0())),
            UserId::new("alice").unwrap(),
        );
        let mut output = Vec::new();
        run(&mut output, &app, false).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"No entries recorded.");
    }
}
