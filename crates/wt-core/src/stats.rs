//! Statistics over a user's time entries.
//!
//! [`compute_stats`] is a pure fold over entries; [`Statistics`] wires it to
//! the store for inclusive calendar-date periods and the current week/month.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::entry::{TimeEntry, duration_seconds};
use crate::error::TrackerError;
use crate::store::EntryStore;
use crate::types::UserId;

/// Derived statistics for a set of entries. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStats {
    /// Sum of entry durations in seconds.
    pub total_duration: i64,

    /// Seconds per calendar day of `start_time`.
    pub daily_stats: BTreeMap<NaiveDate, i64>,

    /// Mean hours per day that has at least one entry.
    pub average_daily_hours: f64,

    /// Longest single entry in seconds.
    pub longest_session: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_session_date: Option<NaiveDate>,

    pub entries: Vec<TimeEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_entry: Option<TimeEntry>,
}

impl TimeStats {
    fn empty(active_entry: Option<TimeEntry>) -> Self {
        Self {
            total_duration: 0,
            daily_stats: BTreeMap::new(),
            average_daily_hours: 0.0,
            longest_session: 0,
            longest_session_date: None,
            entries: Vec::new(),
            active_entry,
        }
    }
}

/// Aggregates `entries`, measuring any that are still running against `now`.
///
/// Days are the UTC calendar date of each entry's `start_time`. On a tie for
/// the longest session the earlier entry in `entries` wins.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_stats(
    entries: Vec<TimeEntry>,
    active_entry: Option<TimeEntry>,
    now: DateTime<Utc>,
) -> TimeStats {
    let mut stats = TimeStats::empty(active_entry);
    if entries.is_empty() {
        return stats;
    }

    let mut longest: Option<(i64, NaiveDate)> = None;
    for entry in &entries {
        let duration = duration_seconds(entry, now);
        let day = entry.start_time.date_naive();

        stats.total_duration += duration;
        *stats.daily_stats.entry(day).or_default() += duration;

        if longest.is_none_or(|(max, _)| duration > max) {
            longest = Some((duration, day));
        }
    }

    if let Some((duration, day)) = longest {
        stats.longest_session = duration;
        stats.longest_session_date = Some(day);
    }

    let days = stats.daily_stats.len();
    if days > 0 {
        stats.average_daily_hours = (stats.total_duration as f64 / 3600.0) / days as f64;
    }

    stats.entries = entries;
    stats
}

/// Formats seconds as `HH:MM:SS`. Hours do not wrap at 24.
pub fn format_duration(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{sign}{hours:02}:{minutes:02}:{secs:02}")
}

/// Period statistics backed by an [`EntryStore`].
#[derive(Debug)]
pub struct Statistics<S: EntryStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: EntryStore + ?Sized> Statistics<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Statistics for completed entries that started within `[start, end]`.
    ///
    /// Open entries never count toward period totals; the user's open entry
    /// is attached as `active_entry` instead. An inverted range is empty.
    pub fn period(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeStats, TrackerError> {
        let entries = if start > end {
            Vec::new()
        } else {
            self.store.list_completed_in_period(user, start, end)?
        };
        let active = self.store.active_entry(user)?;
        tracing::debug!(
            user = %user,
            %start,
            %end,
            entries = entries.len(),
            "computing period statistics"
        );
        Ok(compute_stats(entries, active, self.clock.now()))
    }

    /// The last seven days through today.
    pub fn current_week(&self, user: &UserId) -> Result<TimeStats, TrackerError> {
        let (start, end) = week_window(self.today());
        self.period(user, start, end)
    }

    /// The last calendar month through today.
    pub fn current_month(&self, user: &UserId) -> Result<TimeStats, TrackerError> {
        let (start, end) = month_window(self.today());
        self.period(user, start, end)
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }
}

/// `[today - 7 days, today]`.
pub fn week_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(7), today)
}

/// `[today - 1 month, today]`, clamping to the end of a shorter month.
///
/// Mar 31 starts the window on Feb 28 (Feb 29 in leap years). Calendars that
/// roll day overflow forward would give Mar 3 instead, so around month ends
/// the two can differ by a few days.
pub fn month_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    (start, today)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use crate::clock::ManualClock;
    use crate::engine::TimeTracker;
    use crate::entry::NewEntry;
    use crate::store::MemoryStore;
    use crate::types::{EntryId, EntryStatus};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
    }

    fn completed(id: &str, start: DateTime<Utc>, hours: i64, paused_hours: i64) -> TimeEntry {
        let mut entry = NewEntry {
            user_id: UserId::new("alice").unwrap(),
            category_id: None,
            start_time: start,
        }
        .into_entry(EntryId::new(id).unwrap());
        entry.end_time = Some(start + Duration::hours(hours));
        entry.total_paused = paused_hours * 3600;
        entry.status = EntryStatus::Completed;
        entry
    }

    #[test]
    fn empty_input_yields_zero_stats_but_keeps_active_entry() {
        let active = NewEntry {
            user_id: UserId::new("alice").unwrap(),
            category_id: None,
            start_time: at(1, 9),
        }
        .into_entry(EntryId::new("open").unwrap());

        let stats = compute_stats(Vec::new(), Some(active.clone()), at(1, 10));
        assert_eq!(stats.total_duration, 0);
        assert!(stats.daily_stats.is_empty());
        assert_eq!(stats.longest_session, 0);
        assert_eq!(stats.longest_session_date, None);
        assert!(stats.average_daily_hours.abs() < f64::EPSILON);
        assert_eq!(stats.active_entry, Some(active));
    }

    #[test]
    fn aggregates_three_days() {
        let entries = vec![
            completed("a", at(1, 9), 2, 0),
            completed("b", at(2, 9), 4, 0),
            completed("c", at(3, 9), 8, 1),
        ];

        let stats = compute_stats(entries, None, at(10, 0));
        assert_eq!(stats.total_duration, 46_800);
        assert_eq!(stats.daily_stats.len(), 3);
        assert_eq!(stats.daily_stats[&date(3)], 25_200);
        assert_eq!(stats.longest_session, 25_200);
        assert_eq!(stats.longest_session_date, Some(date(3)));
        assert!((stats.average_daily_hours - 13.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.entries.len(), 3);
    }

    #[test]
    fn entries_on_same_day_share_a_bucket() {
        let entries = vec![completed("a", at(1, 9), 1, 0), completed("b", at(1, 14), 2, 0)];

        let stats = compute_stats(entries, None, at(2, 0));
        assert_eq!(stats.daily_stats.len(), 1);
        assert_eq!(stats.daily_stats[&date(1)], 10_800);
        assert!((stats.average_daily_hours - 3.0).abs() < 1e-9);
    }

    #[test]
    fn longest_session_tie_keeps_first() {
        let entries = vec![completed("a", at(4, 9), 3, 0), completed("b", at(2, 9), 3, 0)];

        let stats = compute_stats(entries, None, at(10, 0));
        assert_eq!(stats.longest_session_date, Some(date(4)));
    }

    #[test]
    fn running_entries_are_measured_against_now() {
        let running = NewEntry {
            user_id: UserId::new("alice").unwrap(),
            category_id: None,
            start_time: at(1, 9),
        }
        .into_entry(EntryId::new("run").unwrap());

        let stats = compute_stats(vec![running], None, at(1, 11));
        assert_eq!(stats.total_duration, 7200);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(4500), "01:15:00");
        assert_eq!(format_duration(90_061), "25:01:01");
        assert_eq!(format_duration(-61), "-00:01:01");
    }

    #[test]
    fn windows_are_inclusive_calendar_ranges() {
        assert_eq!(week_window(date(10)), (date(3), date(10)));
        assert_eq!(
            month_window(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()).0,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            month_window(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()),
            (
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
            )
        );
    }

    struct Fixture {
        tracker: TimeTracker<MemoryStore>,
        stats: Statistics<MemoryStore>,
        clock: Arc<ManualClock>,
        alice: UserId,
    }

    fn fixture(now: DateTime<Utc>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now));
        Fixture {
            tracker: TimeTracker::new(Arc::clone(&store), clock.clone()),
            stats: Statistics::new(store, clock.clone()),
            clock,
            alice: UserId::new("alice").unwrap(),
        }
    }

    fn record(f: &Fixture, start: DateTime<Utc>, minutes: i64) {
        f.clock.set(start);
        f.tracker.start(&f.alice, None).unwrap();
        f.clock.set(start + Duration::minutes(minutes));
        f.tracker.stop(&f.alice).unwrap();
    }

    #[test]
    fn period_excludes_open_entries_inside_range() {
        let f = fixture(at(1, 9));
        record(&f, at(1, 9), 60);
        record(&f, at(2, 9), 30);
        f.clock.set(at(3, 9));
        let open = f.tracker.start(&f.alice, None).unwrap();
        f.clock.set(at(3, 12));

        let stats = f.stats.period(&f.alice, date(1), date(3)).unwrap();
        assert_eq!(stats.total_duration, 5400);
        assert_eq!(stats.entries.len(), 2);
        assert!(!stats.daily_stats.contains_key(&date(3)));
        assert_eq!(stats.active_entry.map(|e| e.id), Some(open.id));
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let f = fixture(at(1, 9));
        record(&f, at(1, 9), 60);
        record(&f, at(2, 9), 60);
        record(&f, at(3, 9), 60);

        let stats = f.stats.period(&f.alice, date(2), date(2)).unwrap();
        assert_eq!(stats.total_duration, 3600);
        assert_eq!(stats.daily_stats.keys().copied().collect::<Vec<_>>(), vec![date(2)]);

        let stats = f.stats.period(&f.alice, date(3), date(1)).unwrap();
        assert!(stats.entries.is_empty());
    }

    #[test]
    fn current_week_and_month_use_clock_date() {
        let f = fixture(at(1, 9));
        record(&f, at(1, 9), 60);
        record(&f, at(21, 9), 120);
        record(&f, at(28, 9), 30);
        f.clock.set(at(28, 18));

        let week = f.stats.current_week(&f.alice).unwrap();
        assert_eq!(week.total_duration, 9000);

        let month = f.stats.current_month(&f.alice).unwrap();
        assert_eq!(month.total_duration, 12_600);
        assert_eq!(month.daily_stats.len(), 3);
    }

    #[test]
    fn stats_serialize_days_as_iso_dates() {
        let stats = compute_stats(vec![completed("a", at(1, 9), 2, 0)], None, at(2, 0));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["daily_stats"]["2025-05-01"], 7200);
        assert_eq!(json["longest_session_date"], "2025-05-01");
        assert!(json.get("active_entry").is_none());
    }
}
