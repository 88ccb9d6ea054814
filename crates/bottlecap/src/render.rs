//! Plain-text rendering of summaries and history for the terminal.

use chrono::NaiveDate;

use bottlecap_core::calculations::WeeklySummary;
use bottlecap_core::formatting::{
    format_day_label, format_drinks, format_rounded, format_week_range,
};
use bottlecap_core::models::{DayTotal, WeekSettings};
use bottlecap_data::aggregator::HistoryBuckets;

const BAR_WIDTH: usize = 30;
const FILLED_CHAR: char = '\u{2588}'; // █  FULL BLOCK
const EMPTY_CHAR: char = '\u{2591}'; // ░  LIGHT SHADE

/// Horizontal bar for `progress` (1.0 = limit reached). Overflow fills the
/// whole bar.
pub fn progress_bar(progress: f64) -> String {
    let clamped = progress.clamp(0.0, 1.0);
    let filled = (clamped * BAR_WIDTH as f64).round() as usize;
    let empty = BAR_WIDTH - filled;
    format!(
        "{}{}",
        std::iter::repeat_n(FILLED_CHAR, filled).collect::<String>(),
        std::iter::repeat_n(EMPTY_CHAR, empty).collect::<String>()
    )
}

/// Current-week status screen.
pub fn summary(summary: &WeeklySummary) -> String {
    format!(
        "{}\n{} {}\n{}  {}/{}\n{}\n",
        format_week_range(summary.week_start),
        format_rounded(summary.total),
        summary.headline(),
        progress_bar(summary.progress()),
        format_rounded(summary.total),
        format_rounded(summary.limit),
        summary.status.message()
    )
}

/// Days of the running week followed by earlier weekly totals.
pub fn history(buckets: &HistoryBuckets, today: NaiveDate) -> String {
    if buckets.is_empty() {
        return "No drinks logged yet.\n".to_string();
    }

    let mut out = String::new();
    if !buckets.current_week.is_empty() {
        out.push_str("This week\n");
        for day in &buckets.current_week {
            out.push_str(&row(&format_day_label(day.day, today), day.total));
        }
    }
    if !buckets.previous_weeks.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Previous weeks\n");
        for week in &buckets.previous_weeks {
            out.push_str(&row(&format_week_range(week.bucket_start), week.total));
        }
    }
    out
}

/// Drill-down of one week.
pub fn week(week_start: NaiveDate, days: &[DayTotal], today: NaiveDate) -> String {
    let mut out = format!("{}\n", format_week_range(week_start));
    if days.is_empty() {
        out.push_str("No drinks logged this week.\n");
        return out;
    }
    for day in days {
        out.push_str(&row(&format_day_label(day.day, today), day.total));
    }
    let total: f64 = days.iter().map(|d| d.total).sum();
    out.push_str(&row("Total", total));
    out
}

pub fn settings(settings: &WeekSettings) -> String {
    format!(
        "Week starts on: {}\nWeekly limit:   {}\n",
        settings.week_start_day,
        format_drinks(settings.drink_limit)
    )
}

fn row(label: &str, total: f64) -> String {
    format!("  {:<16}{}\n", label, format_drinks(total))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
