use chrono::{Days, NaiveDate};

/// Round a drink quantity to one decimal place.
///
/// This is the canonical quantity: every total is passed through it before it
/// is displayed or compared against the weekly limit. Halves round away from
/// zero.
///
/// # Examples
///
/// ```
/// use bottlecap_core::formatting::rounded_value;
///
/// assert_eq!(rounded_value(6.45), 6.5);
/// assert_eq!(rounded_value(2.04), 2.0);
/// assert_eq!(rounded_value(0.0), 0.0);
/// ```
pub fn rounded_value(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Format a quantity after [`rounded_value`], dropping the decimal when the
/// rounded value is whole.
///
/// # Examples
///
/// ```
/// use bottlecap_core::formatting::format_rounded;
///
/// assert_eq!(format_rounded(6.0),  "6");
/// assert_eq!(format_rounded(6.5),  "6.5");
/// assert_eq!(format_rounded(6.45), "6.5");
/// assert_eq!(format_rounded(2.04), "2");
/// ```
pub fn format_rounded(value: f64) -> String {
    let rounded = rounded_value(value);
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

/// `"drink"` when the rounded quantity is exactly one, otherwise `"drinks"`.
pub fn drink_word(value: f64) -> &'static str {
    if rounded_value(value) == 1.0 {
        "drink"
    } else {
        "drinks"
    }
}

/// Quantity plus unit, e.g. `"1 drink"`, `"2.5 drinks"`.
pub fn format_drinks(value: f64) -> String {
    format!("{} {}", format_rounded(value), drink_word(value))
}

/// Title of a weekly bucket, e.g. `"Oct 7 - Oct 13"`.
pub fn format_week_range(week_start: NaiveDate) -> String {
    let week_end = week_start + Days::new(6);
    format!(
        "{} - {}",
        week_start.format("%b %-d"),
        week_end.format("%b %-d")
    )
}

/// Row label for a single day: `"Today"` or e.g. `"Wed 9 Oct"`.
pub fn format_day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else {
        day.format("%a %-d %b").to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
