//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;

/// Pre-compiled regex for relative date parsing.
static RELATIVE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(day|week)s?\s+ago$").unwrap());

/// Conservative bound for relative dates (~1000 years in days).
const MAX_RELATIVE_DAYS: i64 = 1000 * 365;

/// Parse a calendar date as ISO `YYYY-MM-DD` or relative to `today`.
///
/// Supports:
/// - ISO: "2026-01-15"
/// - "today"
/// - Relative: "3 days ago", "1 week ago"
pub fn parse_date(s: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("today") {
        return Ok(today);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    let Some(caps) = RELATIVE_DATE_RE.captures(s) else {
        anyhow::bail!(
            "Invalid date: {s}. Use YYYY-MM-DD (e.g., 2026-01-15), 'today' or relative (e.g., '3 days ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative date")?;

    let (max_for_unit, days_per_unit) = match &caps[2] {
        "day" => (MAX_RELATIVE_DAYS, 1),
        "week" => (MAX_RELATIVE_DAYS / 7, 7),
        unit => anyhow::bail!("Unknown date unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative date value too large: {n} {}", &caps[2]);
    }

    today
        .checked_sub_signed(Duration::days(n * days_per_unit))
        .with_context(|| format!("date out of range: {s}"))
}

/// Renders a timestamp the way every command prints them.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn parses_iso_dates_and_today() {
        assert_eq!(
            parse_date("2025-01-15", today()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert_eq!(parse_date("today", today()).unwrap(), today());
    }

    #[test]
    fn parses_relative_dates() {
        assert_eq!(
            parse_date("1 day ago", today()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );
        assert_eq!(
            parse_date("2 weeks ago", today()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 24).unwrap()
        );
    }

    #[test]
    fn rejects_unknown_formats() {
        let err = parse_date("next tuesday", today()).unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
        assert!(parse_date("2025-02-30", today()).is_err());
        assert!(parse_date("999999 weeks ago", today()).is_err());
    }

    #[test]
    fn formats_timestamps_in_utc() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 8, 5, 9).unwrap();
        assert_eq!(format_timestamp(ts), "2025-03-10 08:05:09");
    }
}
