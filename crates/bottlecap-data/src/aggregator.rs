//! Weekly bucketing of drink history.
//!
//! Entries are first collapsed into per-day totals, then split into the days
//! of the current week and seven-day buckets for every earlier week. Buckets
//! are always derived from the entries and the week-start day in effect, never
//! stored.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bottlecap_core::models::{DayTotal, DrinkEntry, WeekBucket, WeekStartDay};
use bottlecap_core::time_utils::{week_days, week_start_for_day, Calendar};

// ── HistoryBuckets ────────────────────────────────────────────────────────────

/// History split into the current week and previous weeks, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBuckets {
    /// First day of the week containing "now".
    pub current_week_start: NaiveDate,
    /// Per-day totals on or after the current week start, newest first.
    pub current_week: Vec<DayTotal>,
    /// Weekly totals before the current week, newest first.
    pub previous_weeks: Vec<WeekBucket>,
}

impl HistoryBuckets {
    pub fn is_empty(&self) -> bool {
        self.current_week.is_empty() && self.previous_weeks.is_empty()
    }

    /// Sum of the current-week days.
    pub fn current_week_total(&self) -> f64 {
        self.current_week.iter().map(|d| d.total).sum()
    }

    /// Sum over every bucket, current and previous.
    pub fn grand_total(&self) -> f64 {
        self.current_week_total() + self.previous_weeks.iter().map(|w| w.total).sum::<f64>()
    }
}

// ── HistoryBucketer ───────────────────────────────────────────────────────────

/// Stateless helper that groups drink entries by day and by week.
pub struct HistoryBucketer;

impl HistoryBucketer {
    /// Collapse entries into per-calendar-day totals.
    pub fn daily_totals(entries: &[DrinkEntry], calendar: &Calendar) -> BTreeMap<NaiveDate, f64> {
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for entry in entries {
            *daily.entry(calendar.day_of(entry.timestamp)).or_insert(0.0) += entry.quantity;
        }
        daily
    }

    /// Bucket raw entries relative to the week containing `now`.
    pub fn bucket_entries(
        entries: &[DrinkEntry],
        week_start: WeekStartDay,
        calendar: &Calendar,
        now: DateTime<Utc>,
    ) -> HistoryBuckets {
        let daily = Self::daily_totals(entries, calendar);
        let current_week_start = calendar.week_start_date(now, week_start);
        tracing::debug!(
            entries = entries.len(),
            days = daily.len(),
            %current_week_start,
            "bucketing drink history"
        );
        Self::bucket_daily_totals(&daily, week_start, current_week_start)
    }

    /// Bucket already-collapsed per-day totals.
    ///
    /// Days on or after `current_week_start` stay individual; earlier days are
    /// summed into the bucket starting at their own week-start day.
    pub fn bucket_daily_totals(
        daily: &BTreeMap<NaiveDate, f64>,
        week_start: WeekStartDay,
        current_week_start: NaiveDate,
    ) -> HistoryBuckets {
        let current_week: Vec<DayTotal> = daily
            .range(current_week_start..)
            .rev()
            .map(|(&day, &total)| DayTotal { day, total })
            .collect();

        let mut weekly: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (&day, &total) in daily.range(..current_week_start) {
            *weekly
                .entry(week_start_for_day(day, week_start))
                .or_insert(0.0) += total;
        }

        let previous_weeks: Vec<WeekBucket> = weekly
            .into_iter()
            .rev()
            .map(|(bucket_start, total)| WeekBucket {
                bucket_start,
                total,
            })
            .collect();

        HistoryBuckets {
            current_week_start,
            current_week,
            previous_weeks,
        }
    }

    /// Days within the week starting at `week_start` that have drinks logged,
    /// in calendar order.
    pub fn week_detail(daily: &BTreeMap<NaiveDate, f64>, week_start: NaiveDate) -> Vec<DayTotal> {
        week_days(week_start)
            .into_iter()
            .filter_map(|day| daily.get(&day).map(|&total| DayTotal { day, total }))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_entry(y: i32, m: u32, d: u32, h: u32, quantity: f64) -> DrinkEntry {
        DrinkEntry::new(quantity, Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    /// Wednesday 2024-10-09, evening.
    fn wednesday_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 9, 18, 0, 0).unwrap()
    }

    fn sample_history() -> Vec<DrinkEntry> {
        vec![
            make_entry(2024, 10, 9, 12, 1.5),
            make_entry(2024, 10, 7, 20, 2.0),
            make_entry(2024, 10, 8, 21, 1.0),
            make_entry(2024, 10, 2, 19, 5.0),
            make_entry(2024, 9, 29, 14, 0.5),
            make_entry(2024, 9, 24, 22, 3.0),
            make_entry(2024, 9, 1, 18, 2.5),
            make_entry(2024, 8, 30, 18, 1.0),
        ]
    }

    // ── daily_totals ──────────────────────────────────────────────────────────

    #[test]
    fn test_daily_totals_sums_same_day() {
        let entries = vec![
            make_entry(2024, 10, 7, 9, 1.0),
            make_entry(2024, 10, 7, 22, 2.5),
            make_entry(2024, 10, 8, 9, 1.0),
        ];
        let daily = HistoryBucketer::daily_totals(&entries, &Calendar::new("UTC"));
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[&date(2024, 10, 7)], 3.5);
        assert_eq!(daily[&date(2024, 10, 8)], 1.0);
    }

    #[test]
    fn test_daily_totals_follow_calendar_timezone() {
        // 03:00 UTC on the 8th is still the 7th in Los Angeles.
        let entries = vec![make_entry(2024, 10, 8, 3, 1.0)];
        let daily = HistoryBucketer::daily_totals(&entries, &Calendar::new("America/Los_Angeles"));
        assert_eq!(daily.keys().copied().collect::<Vec<_>>(), vec![date(2024, 10, 7)]);
    }

    // ── bucket_entries ────────────────────────────────────────────────────────

    #[test]
    fn test_bucket_entries_scenario() {
        let entries = vec![
            make_entry(2024, 10, 7, 20, 2.0),
            make_entry(2024, 10, 8, 21, 1.0),
            make_entry(2024, 10, 2, 19, 5.0),
        ];
        let buckets = HistoryBucketer::bucket_entries(
            &entries,
            WeekStartDay::Monday,
            &Calendar::new("UTC"),
            wednesday_now(),
        );

        assert_eq!(buckets.current_week_start, date(2024, 10, 7));
        assert_eq!(
            buckets.current_week,
            vec![
                DayTotal { day: date(2024, 10, 8), total: 1.0 },
                DayTotal { day: date(2024, 10, 7), total: 2.0 },
            ]
        );
        assert_eq!(buckets.current_week_total(), 3.0);
        assert_eq!(
            buckets.previous_weeks,
            vec![WeekBucket { bucket_start: date(2024, 9, 30), total: 5.0 }]
        );
    }

    #[test]
    fn test_bucket_entries_empty() {
        let buckets = HistoryBucketer::bucket_entries(
            &[],
            WeekStartDay::Monday,
            &Calendar::new("UTC"),
            wednesday_now(),
        );
        assert!(buckets.is_empty());
        assert_eq!(buckets.grand_total(), 0.0);
        // The running week is known even before anything is logged.
        assert_eq!(buckets.current_week_start, date(2024, 10, 7));
    }

    #[test]
    fn test_previous_weeks_sorted_newest_first() {
        let buckets = HistoryBucketer::bucket_entries(
            &sample_history(),
            WeekStartDay::Monday,
            &Calendar::new("UTC"),
            wednesday_now(),
        );
        let starts: Vec<NaiveDate> = buckets.previous_weeks.iter().map(|w| w.bucket_start).collect();
        assert_eq!(
            starts,
            vec![
                date(2024, 9, 30),
                date(2024, 9, 23),
                date(2024, 8, 26),
            ]
        );
        // 2024-09-01 (Sunday) and 2024-08-30 (Friday) share the week of Aug 26.
        assert_eq!(buckets.previous_weeks[2].total, 3.5);
        // 2024-09-29 (Sunday) belongs to the week of Sep 23.
        assert_eq!(buckets.previous_weeks[1].total, 3.5);
    }

    #[test]
    fn test_future_day_in_current_week_is_kept() {
        let entries = vec![make_entry(2024, 10, 11, 20, 1.0)];
        let buckets = HistoryBucketer::bucket_entries(
            &entries,
            WeekStartDay::Monday,
            &Calendar::new("UTC"),
            wednesday_now(),
        );
        assert_eq!(buckets.current_week[0].day, date(2024, 10, 11));
    }

    #[test]
    fn test_bucketing_is_idempotent_and_partitions_days() {
        let entries = sample_history();
        let calendar = Calendar::new("UTC");
        let first =
            HistoryBucketer::bucket_entries(&entries, WeekStartDay::Monday, &calendar, wednesday_now());
        let second =
            HistoryBucketer::bucket_entries(&entries, WeekStartDay::Monday, &calendar, wednesday_now());
        assert_eq!(first, second);

        // Every entry day lands in exactly one bucket.
        let daily = HistoryBucketer::daily_totals(&entries, &calendar);
        let mut covered: BTreeSet<NaiveDate> = BTreeSet::new();
        for day in &first.current_week {
            assert!(covered.insert(day.day));
        }
        for bucket in &first.previous_weeks {
            for day in HistoryBucketer::week_detail(&daily, bucket.bucket_start) {
                assert!(covered.insert(day.day), "{} in two buckets", day.day);
            }
        }
        let expected: BTreeSet<NaiveDate> = daily.keys().copied().collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn test_total_is_conserved_for_every_week_start_day() {
        let entries = sample_history();
        let expected: f64 = entries.iter().map(|e| e.quantity).sum();
        let calendar = Calendar::new("UTC");

        for week_start in WeekStartDay::ALL {
            let buckets =
                HistoryBucketer::bucket_entries(&entries, week_start, &calendar, wednesday_now());
            assert!(
                (buckets.grand_total() - expected).abs() < 1e-9,
                "{week_start}: {} != {expected}",
                buckets.grand_total()
            );
            for bucket in &buckets.previous_weeks {
                assert_eq!(
                    chrono::Datelike::weekday(&bucket.bucket_start),
                    week_start.weekday()
                );
            }
        }
    }

    #[test]
    fn test_changing_week_start_moves_days_between_buckets() {
        let entries = vec![make_entry(2024, 10, 6, 20, 2.0), make_entry(2024, 10, 8, 20, 1.0)];
        let calendar = Calendar::new("UTC");

        let monday =
            HistoryBucketer::bucket_entries(&entries, WeekStartDay::Monday, &calendar, wednesday_now());
        assert_eq!(monday.current_week.len(), 1);
        assert_eq!(monday.previous_weeks.len(), 1);

        let sunday =
            HistoryBucketer::bucket_entries(&entries, WeekStartDay::Sunday, &calendar, wednesday_now());
        assert_eq!(sunday.current_week.len(), 2);
        assert!(sunday.previous_weeks.is_empty());
    }

    // ── week_detail ───────────────────────────────────────────────────────────

    #[test]
    fn test_week_detail_lists_only_logged_days() {
        let daily = HistoryBucketer::daily_totals(&sample_history(), &Calendar::new("UTC"));
        let detail = HistoryBucketer::week_detail(&daily, date(2024, 9, 23));
        assert_eq!(
            detail,
            vec![
                DayTotal { day: date(2024, 9, 24), total: 3.0 },
                DayTotal { day: date(2024, 9, 29), total: 0.5 },
            ]
        );
    }

    #[test]
    fn test_week_detail_empty_week() {
        let daily = HistoryBucketer::daily_totals(&sample_history(), &Calendar::new("UTC"));
        assert!(HistoryBucketer::week_detail(&daily, date(2024, 9, 16)).is_empty());
    }
}
