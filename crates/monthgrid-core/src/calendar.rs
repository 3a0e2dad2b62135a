//! Calendar systems and calendar-aware arithmetic.
//!
//! Every cache key and bucket boundary in monthgrid is computed through a
//! [`CalendarSystem`], never through fixed durations: days can last 23 or 25
//! hours across daylight-saving transitions and months vary in length.
//!
//! [`ZonedCalendar`] is the Gregorian implementation, reckoned in any chrono
//! time zone (including `chrono_tz::Tz`).

use std::fmt;

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::range::DateRange;

/// A calendar unit used for arithmetic and differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarUnit {
    Day,
    Week,
    Month,
    Year,
}

/// Errors raised while building a calendar system.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The time zone name is not in the IANA database.
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
}

/// A calendar system: the rules that turn instants into days and months.
///
/// All instants are exchanged as UTC; the calendar decides where local days
/// and months begin.
pub trait CalendarSystem: Clone + fmt::Debug + Send + Sync + 'static {
    /// A short identifier used in logs (e.g. `gregorian@Europe/Paris`).
    fn identifier(&self) -> String;

    /// Converts an instant to this calendar's local wall-clock time.
    fn to_local(&self, at: DateTime<Utc>) -> NaiveDateTime;

    /// Truncates `at` to the first instant of its local day.
    fn start_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc>;

    /// Returns the first instant of the month containing `at`.
    fn start_of_month(&self, at: DateTime<Utc>) -> DateTime<Utc>;

    /// Adds `amount` calendar units to `at`.
    ///
    /// Returns `None` when the result is outside the representable range.
    fn add(&self, unit: CalendarUnit, amount: i32, at: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// Counts the whole `unit`s between `from` and `to`, truncated toward zero.
    ///
    /// Negative when `to` is before `from`.
    fn difference(&self, unit: CalendarUnit, from: DateTime<Utc>, to: DateTime<Utc>) -> i64;

    /// Returns the start of the month following the one containing `at`.
    fn start_of_next_month(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let month = self.start_of_month(at);
        self.add(CalendarUnit::Month, 1, month)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns the start of the day following the one containing `at`.
    ///
    /// Local dates a zone skipped entirely are stepped over.
    fn next_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let day = self.start_of_day(at);
        (1..=2)
            .filter_map(|days| self.add(CalendarUnit::Day, days, day))
            .map(|next| self.start_of_day(next))
            .find(|next| *next > day)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns the half-open range covering the month containing `at`.
    fn month_range(&self, at: DateTime<Utc>) -> DateRange {
        let start = self.start_of_month(at);
        DateRange::new(start, self.start_of_next_month(start))
    }
}

/// Truncates `at` to the start of its day in `calendar`.
pub fn start_of_day<C: CalendarSystem>(calendar: &C, at: DateTime<Utc>) -> DateTime<Utc> {
    calendar.start_of_day(at)
}

/// Returns the start of the month containing `at` in `calendar`.
pub fn start_of_month<C: CalendarSystem>(calendar: &C, at: DateTime<Utc>) -> DateTime<Utc> {
    calendar.start_of_month(at)
}

/// Returns `start_of_month(at)` advanced by exactly one calendar month.
pub fn start_of_next_month<C: CalendarSystem>(calendar: &C, at: DateTime<Utc>) -> DateTime<Utc> {
    calendar.start_of_next_month(at)
}

/// The Gregorian calendar reckoned in a time zone.
///
/// Local times skipped by a transition are read with the offset in force
/// before it, so a skipped midnight resolves to the instant the new offset
/// starts (the first valid local instant after it). Repeated local times
/// resolve to the earliest instant.
#[derive(Debug, Clone)]
pub struct ZonedCalendar<Tz: TimeZone> {
    tz: Tz,
}

impl ZonedCalendar<Utc> {
    /// Gregorian calendar in UTC.
    pub fn utc() -> Self {
        Self { tz: Utc }
    }
}

impl ZonedCalendar<chrono_tz::Tz> {
    /// Gregorian calendar in an IANA time zone such as `Europe/Paris`.
    pub fn named(name: &str) -> Result<Self, CalendarError> {
        name.parse::<chrono_tz::Tz>()
            .map(Self::new)
            .map_err(|_| CalendarError::UnknownTimeZone(name.to_string()))
    }
}

impl<Tz: TimeZone> ZonedCalendar<Tz> {
    /// Creates a Gregorian calendar in the given time zone.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Returns the time zone.
    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Maps a local wall-clock time to an instant.
    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            // Inside a gap: keep the offset in force before the transition,
            // which lands on the far side of the gap however long it is.
            LocalResult::None => {
                let before = local.checked_sub_days(Days::new(1))?;
                let offset = self.tz.offset_from_local_datetime(&before).earliest()?.fix();
                let utc = local.checked_sub_signed(Duration::seconds(i64::from(
                    offset.local_minus_utc(),
                )))?;
                Some(Utc.from_utc_datetime(&utc))
            }
        }
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        self.resolve(midnight)
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

impl<Tz> CalendarSystem for ZonedCalendar<Tz>
where
    Tz: TimeZone + fmt::Debug + Send + Sync + 'static,
{
    fn identifier(&self) -> String {
        format!("gregorian@{:?}", self.tz)
    }

    fn to_local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.tz).naive_local()
    }

    fn start_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        self.local_midnight(self.to_local(at).date())
    }

    fn start_of_month(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.to_local(at).date();
        self.local_midnight(date.with_day(1).unwrap_or(date))
    }

    fn add(&self, unit: CalendarUnit, amount: i32, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = self.to_local(at);
        let shifted = match unit {
            CalendarUnit::Day => shift_days(local, i64::from(amount)),
            CalendarUnit::Week => shift_days(local, i64::from(amount) * 7),
            CalendarUnit::Month => shift_months(local, amount),
            CalendarUnit::Year => shift_months(local, amount.checked_mul(12)?),
        }?;
        self.resolve(shifted)
    }

    fn difference(&self, unit: CalendarUnit, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        if to < from {
            return -self.difference(unit, to, from);
        }
        let a = self.to_local(from);
        let b = self.to_local(to);
        match unit {
            CalendarUnit::Day => whole_days(a, b),
            CalendarUnit::Week => whole_days(a, b) / 7,
            CalendarUnit::Month => whole_months(a, b),
            CalendarUnit::Year => whole_months(a, b) / 12,
        }
    }
}

fn shift_days(local: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    if days >= 0 {
        local.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        local.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

fn shift_months(local: NaiveDateTime, months: i32) -> Option<NaiveDateTime> {
    if months >= 0 {
        local.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        local.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

fn whole_days(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    let mut days = (b.date() - a.date()).num_days();
    if b.time() < a.time() {
        days -= 1;
    }
    days.max(0)
}

fn whole_months(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    let mut months = i64::from(b.year() - a.year()) * 12 + i64::from(b.month())
        - i64::from(a.month());
    if (b.day(), b.time()) < (a.day(), a.time()) {
        months -= 1;
    }
    months.max(0)
}
