use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone as _, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{BottleCapError, Result};
use crate::models::WeekStartDay;

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of the current instant, injected so aggregation stays deterministic
/// under test.
pub trait Clock: Send + Sync {
    /// Current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── Week anchoring ────────────────────────────────────────────────────────────

/// The most recent `week_start` on or before `day`.
///
/// Walks back at most six days, so the result is always within the same
/// seven-day window as `day`.
pub fn week_start_for_day(day: NaiveDate, week_start: WeekStartDay) -> NaiveDate {
    let target = week_start.weekday();
    let mut candidate = day;
    for _ in 0..7 {
        if candidate.weekday() == target {
            return candidate;
        }
        candidate = candidate.pred_opt().unwrap_or(candidate);
    }
    // Seven consecutive days always contain every weekday; only reachable at
    // the very start of chrono's supported date range.
    let back = (7 + day.weekday().num_days_from_monday() - target.num_days_from_monday()) % 7;
    day.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(NaiveDate::MIN)
}

/// The seven calendar days of the week starting at `week_start`.
pub fn week_days(week_start: NaiveDate) -> [NaiveDate; 7] {
    let mut days = [week_start; 7];
    for (offset, slot) in days.iter_mut().enumerate() {
        *slot = week_start + Days::new(offset as u64);
    }
    days
}

// ── Calendar ──────────────────────────────────────────────────────────────────

/// Maps instants to calendar days in one IANA timezone.
///
/// Every "which day is this" and "when does this day start" question in the
/// crate goes through a `Calendar`, so buckets follow the user's local days
/// rather than UTC days.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    tz: Tz,
}

impl Default for Calendar {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl Calendar {
    /// Create a calendar in the given IANA timezone.
    ///
    /// `"auto"` resolves to the system timezone. Unknown names fall back to
    /// UTC and log a warning.
    pub fn new(tz_name: &str) -> Self {
        let resolved = if tz_name.eq_ignore_ascii_case("auto") {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let tz = resolved.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "Calendar: unrecognised timezone \"{}\", falling back to UTC",
                resolved
            );
            Tz::UTC
        });
        Self { tz }
    }

    /// Like [`Calendar::new`] but rejects an unknown timezone name instead of
    /// falling back to UTC. `"auto"` is always accepted.
    pub fn try_new(tz_name: &str) -> Result<Self> {
        if !tz_name.eq_ignore_ascii_case("auto") && !Self::validate_timezone(tz_name) {
            return Err(BottleCapError::Config(format!(
                "unknown timezone \"{tz_name}\""
            )));
        }
        Ok(Self::new(tz_name))
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The local calendar day containing `instant`.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// First instant of `day` in this calendar.
    ///
    /// When local midnight is skipped by a DST transition the first hour of
    /// the day that does exist is used instead.
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        for hour in 0..24 {
            let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
            if let Some(dt) = self.tz.from_local_datetime(&day.and_time(time)).earliest() {
                return dt.with_timezone(&Utc);
            }
        }
        day.and_time(NaiveTime::MIN).and_utc()
    }

    /// Half-open instant range `[start, end)` covering `day`.
    pub fn day_range(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = day.succ_opt().unwrap_or(day);
        (self.start_of_day(day), self.start_of_day(next))
    }

    /// The calendar day on which the week containing `reference` starts.
    pub fn week_start_date(&self, reference: DateTime<Utc>, week_start: WeekStartDay) -> NaiveDate {
        week_start_for_day(self.day_of(reference), week_start)
    }

    /// Start-of-day instant of the week containing `reference`.
    pub fn week_start_instant(
        &self,
        reference: DateTime<Utc>,
        week_start: WeekStartDay,
    ) -> DateTime<Utc> {
        self.start_of_day(self.week_start_date(reference, week_start))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
