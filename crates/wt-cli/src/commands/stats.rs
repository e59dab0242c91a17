//! Stats command for period totals.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use wt_core::stats::{month_window, week_window};
use wt_core::{TimeStats, format_duration};

use super::util::parse_date;
use crate::App;
use crate::cli::StatsArgs;

/// Which dates a stats query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Range(NaiveDate, NaiveDate),
}

impl Period {
    /// Resolves the flags against `today`. No flags means the last week.
    pub fn from_args(args: &StatsArgs, today: NaiveDate) -> Result<Self> {
        if let (Some(from), Some(to)) = (&args.from, &args.to) {
            let from = parse_date(from, today).context("invalid --from date")?;
            let to = parse_date(to, today).context("invalid --to date")?;
            return Ok(Self::Range(from, to));
        }
        if args.month {
            return Ok(Self::Month);
        }
        Ok(Self::Week)
    }

    pub fn bounds(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Week => week_window(today),
            Self::Month => month_window(today),
            Self::Range(from, to) => (from, to),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsOutput<'a> {
    from: NaiveDate,
    to: NaiveDate,
    #[serde(flatten)]
    stats: &'a TimeStats,
}

pub fn run<W: Write>(writer: &mut W, app: &App, args: &StatsArgs) -> Result<()> {
    let now = app.tracker.now();
    let today = now.date_naive();
    let (from, to) = Period::from_args(args, today)?.bounds(today);
    let stats = app.stats.period(&app.user, from, to)?;

    if args.json {
        let output = StatsOutput {
            from,
            to,
            stats: &stats,
        };
        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "Period: {from} to {to}")?;
    writeln!(writer, "Total: {}", format_duration(stats.total_duration))?;
    writeln!(writer, "Entries: {}", stats.entries.len())?;

    if !stats.daily_stats.is_empty() {
        writeln!(writer, "Days:")?;
        for (day, seconds) in &stats.daily_stats {
            writeln!(writer, "  {day}  {}", format_duration(*seconds))?;
        }
        writeln!(
            writer,
            "Average per day: {:.2} h",
            stats.average_daily_hours
        )?;
    }
    if let Some(day) = stats.longest_session_date {
        writeln!(
            writer,
            "Longest session: {} on {day}",
            format_duration(stats.longest_session)
        )?;
    }
    if let Some(active) = &stats.active_entry {
        writeln!(
            writer,
            "Open entry: {} ({}, {})",
            active.id,
            active.status,
            format_duration(active.duration(now))
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

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn args() -> StatsArgs {
        StatsArgs {
            week: false,
            month: false,
            from: None,
            to: None,
            json: false,
        }
    }

    struct Fixture {
        app: App,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(at(1, 9)));
            let app = App::new(
                Database::open_in_memory().unwrap(),
                clock.clone(),
                UserId::new("alice").unwrap(),
            );
            Self { app, clock }
        }

        fn record(&self, start: DateTime<Utc>, work: Duration, pause: Duration) {
            self.clock.set(start);
            self.app.tracker.start(&self.app.user, None).unwrap();
            if pause > Duration::zero() {
                self.clock.set(start + Duration::minutes(30));
                self.app.tracker.pause(&self.app.user).unwrap();
                self.clock.set(start + Duration::minutes(30) + pause);
                self.app.tracker.resume(&self.app.user).unwrap();
            }
            self.clock.set(start + work + pause);
            self.app.tracker.stop(&self.app.user).unwrap();
        }
    }

    #[test]
    fn period_resolution() {
        let today = date(10);
        assert_eq!(Period::from_args(&args(), today).unwrap(), Period::Week);

        let month = StatsArgs {
            month: true,
            ..args()
        };
        assert_eq!(Period::from_args(&month, today).unwrap(), Period::Month);

        let range = StatsArgs {
            from: Some("1 week ago".to_string()),
            to: Some("today".to_string()),
            ..args()
        };
        assert_eq!(
            Period::from_args(&range, today).unwrap(),
            Period::Range(date(3), date(10))
        );

        let bad = StatsArgs {
            from: Some("soon".to_string()),
            to: Some("today".to_string()),
            ..args()
        };
        let err = Period::from_args(&bad, today).unwrap_err();
        assert!(err.to_string().contains("invalid --from date"));
    }

    #[test]
    fn range_summary() {
        let f = Fixture::new();
        f.record(at(3, 9), Duration::hours(2), Duration::zero());
        f.record(at(4, 9), Duration::hours(4), Duration::zero());
        f.record(at(5, 9), Duration::hours(7), Duration::hours(1));
        f.clock.set(at(6, 9));
        f.app.tracker.start(&f.app.user, None).unwrap();
        f.clock.set(at(6, 10));

        let range = StatsArgs {
            from: Some("2025-03-03".to_string()),
            to: Some("2025-03-06".to_string()),
            ..args()
        };
        let mut output = Vec::new();
        run(&mut output, &f.app, &range).unwrap();

        let active = f.app.tracker.get_active(&f.app.user).unwrap().unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(active.id.as_str(), "[ID]");
        assert_snapshot!(output, @r"
        Period: 2025-03-03 to 2025-03-06
        Total: 13:00:00
        Entries: 3
        Days:
          2025-03-03  02:00:00
          2025-03-04  04:00:00
          2025-03-05  07:00:00
        Average per day: 4.33 h
        Longest session: 07:00:00 on 2025-03-05
        Open entry: [ID] (active, 01:00:00)
        ");
    }

    #[test]
    fn week_json_reports_window() {
        let f = Fixture::new();
        f.record(at(2, 9), Duration::hours(1), Duration::zero());
        f.record(at(8, 9), Duration::hours(3), Duration::zero());
        f.clock.set(at(10, 12));

        let week = StatsArgs {
            week: true,
            json: true,
            ..args()
        };
        let mut output = Vec::new();
        run(&mut output, &f.app, &week).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["from"], "2025-03-03");
        assert_eq!(value["to"], "2025-03-10");
        assert_eq!(value["total_duration"], 10_800);
        assert_eq!(value["daily_stats"]["2025-03-08"], 10_800);
        assert_eq!(value["entries"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn label_and_query_share_one_window() {
        let f = Fixture::new();
        f.record(at(28, 9), Duration::hours(1), Duration::zero());
        f.clock.set(at(31, 23));

        let month = StatsArgs {
            month: true,
            json: true,
            ..args()
        };
        let mut output = Vec::new();
        run(&mut output, &f.app, &month).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["from"], "2025-02-28");
        assert_eq!(value["to"], "2025-03-31");
        assert_eq!(value["total_duration"], 3600);
    }

    #[test]
    fn empty_period() {
        let f = Fixture::new();
        let mut output = Vec::new();
        run(&mut output, &f.app, &args()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Period: 2025-02-22 to 2025-03-01
        Total: 00:00:00
        Entries: 0
        ");
    }
}
