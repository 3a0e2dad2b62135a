//! Half-open date ranges.
//!
//! [`DateRange`] is the unit of exchange between the widget, the loader and
//! event sources: visible spans, month windows and event occupancy are all
//! `[start, end)` intervals over UTC instants. Day enumeration is delegated to
//! a [`CalendarSystem`] so irregular days are walked correctly.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::ControlFlow;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{CalendarSystem, CalendarUnit};

/// Errors raised when building a [`DateRange`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The start is after the end.
    #[error("range start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// An immutable half-open interval `[start, end)`.
///
/// `start <= end` always holds; an empty range has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr", into = "RangeRepr")]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct RangeRepr {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RangeRepr> for DateRange {
    type Error = RangeError;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        Self::try_new(repr.start, repr.end)
    }
}

impl From<DateRange> for RangeRepr {
    fn from(range: DateRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

impl DateRange {
    /// Creates a range, swapping the endpoints if they are inverted.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Creates a range, rejecting inverted endpoints.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RangeError> {
        if start <= end {
            Ok(Self { start, end })
        } else {
            Err(RangeError::Inverted { start, end })
        }
    }

    /// Creates an empty range positioned at `at`.
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    /// The range covering the day containing `at` in `calendar`.
    pub fn day<C: CalendarSystem>(calendar: &C, at: DateTime<Utc>) -> Self {
        let start = calendar.start_of_day(at);
        Self::new(start, calendar.next_day(start))
    }

    /// The range covering the month containing `at` in `calendar`.
    pub fn month<C: CalendarSystem>(calendar: &C, at: DateTime<Utc>) -> Self {
        calendar.month_range(at)
    }

    /// Inclusive start.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns `true` when `start == end`.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Elapsed time between the endpoints.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns `true` iff `start <= date < end`.
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start <= date && date < self.end
    }

    /// Returns `true` iff the ranges share at least one instant.
    ///
    /// Adjacent ranges meeting at a boundary do not intersect, and an empty
    /// range intersects nothing.
    pub fn intersects(&self, other: &DateRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end
            && other.start < self.end
    }

    /// The overlapping part of both ranges, if any.
    pub fn intersection(&self, other: &DateRange) -> Option<DateRange> {
        self.intersects(other).then(|| DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Counts the whole calendar units between `start` and `end`.
    pub fn components_between<C: CalendarSystem>(&self, unit: CalendarUnit, calendar: &C) -> i64 {
        calendar.difference(unit, self.start, self.end)
    }

    /// Lazily enumerates the start of every day the range touches.
    ///
    /// The first day is `start` rounded down to its own day; enumeration stops
    /// before `end`.
    pub fn days<'a, C: CalendarSystem>(&self, calendar: &'a C) -> Days<'a, C> {
        let next = (!self.is_empty()).then(|| calendar.start_of_day(self.start));
        Days {
            calendar,
            next,
            end: self.end,
        }
    }

    /// Calls `f` for every day in the range until it returns `Break`.
    ///
    /// Returns `true` when every day was visited.
    pub fn for_each_day<C, F>(&self, calendar: &C, mut f: F) -> bool
    where
        C: CalendarSystem,
        F: FnMut(DateTime<Utc>) -> ControlFlow<()>,
    {
        for day in self.days(calendar) {
            if f(day).is_break() {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Iterator over the day starts of a [`DateRange`].
///
/// Created by [`DateRange::days`]. It cannot be restarted; call `days` again
/// for a fresh enumeration.
#[derive(Debug)]
pub struct Days<'a, C: CalendarSystem> {
    calendar: &'a C,
    next: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
}

impl<C: CalendarSystem> Iterator for Days<'_, C> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let day = self.next.take()?;
        if day >= self.end {
            return None;
        }
        let following = self.calendar.next_day(day);
        // A calendar that fails to advance ends the walk instead of looping.
        if following > day {
            self.next = Some(following);
        }
        Some(day)
    }
}

impl<C: CalendarSystem> FusedIterator for Days<'_, C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::ZonedCalendar;
    use chrono::{Datelike, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn range(a: DateTime<Utc>, b: DateTime<Utc>) -> DateRange {
        DateRange::try_new(a, b).unwrap()
    }

    #[test]
    fn inverted_range_is_rejected_or_normalized() {
        let a = utc(2025, 3, 2, 0);
        let b = utc(2025, 3, 1, 0);
        assert_eq!(
            DateRange::try_new(a, b),
            Err(RangeError::Inverted { start: a, end: b })
        );
        let normalized = DateRange::new(a, b);
        assert_eq!(normalized.start(), b);
        assert_eq!(normalized.end(), a);
    }

    #[test]
    fn contains_is_half_open() {
        let r = range(utc(2025, 3, 1, 0), utc(2025, 3, 2, 0));
        assert!(r.contains(utc(2025, 3, 1, 0)));
        assert!(r.contains(utc(2025, 3, 1, 23)));
        assert!(!r.contains(utc(2025, 3, 2, 0)));
        assert!(!r.contains(utc(2025, 2, 28, 23)));
    }

    #[test]
    fn intersects_is_symmetric() {
        let samples = [
            range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 0)),
            range(utc(2025, 3, 4, 0), utc(2025, 3, 9, 0)),
            range(utc(2025, 3, 5, 0), utc(2025, 3, 6, 0)),
            range(utc(2025, 2, 1, 0), utc(2025, 4, 1, 0)),
            DateRange::empty(utc(2025, 3, 3, 0)),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(a.intersects(b), b.intersects(a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn adjacent_ranges_do_not_intersect() {
        let a = range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 0));
        let b = range(utc(2025, 3, 5, 0), utc(2025, 3, 6, 0));
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn empty_range_intersects_nothing() {
        let outer = range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 0));
        let empty = DateRange::empty(utc(2025, 3, 3, 0));
        assert!(empty.is_empty());
        assert!(!outer.intersects(&empty));
        assert!(!empty.contains(utc(2025, 3, 3, 0)));
    }

    #[test]
    fn intersection_clips_both_sides() {
        let a = range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 0));
        let b = range(utc(2025, 3, 4, 0), utc(2025, 3, 9, 0));
        assert_eq!(
            a.intersection(&b),
            Some(range(utc(2025, 3, 4, 0), utc(2025, 3, 5, 0)))
        );
    }

    #[test]
    fn equality_compares_endpoints() {
        let a = range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 0));
        assert_eq!(a, range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 0)));
        assert_ne!(a, range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 1)));
    }

    #[test]
    fn days_of_a_month_are_ascending_and_unique() {
        let cal = ZonedCalendar::utc();
        for (month, expected) in [(1, 31), (2, 28), (4, 30), (12, 31)] {
            let r = DateRange::month(&cal, utc(2025, month, 10, 0));
            let days: Vec<_> = r.days(&cal).collect();
            assert_eq!(days.len(), expected, "month {month}");
            assert!(days.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(days[0], utc(2025, month, 1, 0));
        }
    }

    #[test]
    fn days_start_from_the_rounded_down_start() {
        let cal = ZonedCalendar::utc();
        let r = range(utc(2025, 3, 30, 10), utc(2025, 4, 2, 9));
        let days: Vec<_> = r.days(&cal).collect();
        assert_eq!(
            days,
            vec![
                utc(2025, 3, 30, 0),
                utc(2025, 3, 31, 0),
                utc(2025, 4, 1, 0),
                utc(2025, 4, 2, 0),
            ]
        );
    }

    #[test]
    fn days_skip_dst_transition_correctly() {
        let cal = ZonedCalendar::named("Europe/Paris").unwrap();
        let march = DateRange::month(&cal, utc(2025, 3, 15, 12));
        let days: Vec<_> = march.days(&cal).collect();
        assert_eq!(days.len(), 31);
        // Local midnight moves from 23:00 UTC to 22:00 UTC after the 30th.
        assert_eq!(days[29], utc(2025, 3, 29, 23));
        assert_eq!(days[30], utc(2025, 3, 30, 22));
    }

    #[test]
    fn days_continue_past_a_skipped_date() {
        let cal = ZonedCalendar::named("Pacific/Apia").unwrap();
        let december = DateRange::month(&cal, utc(2011, 12, 15, 12));
        let days: Vec<_> = december.days(&cal).map(|day| cal.to_local(day).day()).collect();
        assert_eq!(days.len(), 30);
        assert_eq!(&days[27..], &[28, 29, 31]);
    }

    #[test]
    fn empty_range_has_no_days() {
        let cal = ZonedCalendar::utc();
        assert_eq!(DateRange::empty(utc(2025, 3, 3, 12)).days(&cal).count(), 0);
    }

    #[test]
    fn for_each_day_stops_on_break() {
        let cal = ZonedCalendar::utc();
        let r = DateRange::month(&cal, utc(2025, 3, 1, 0));
        let mut seen = Vec::new();
        let completed = r.for_each_day(&cal, |day| {
            seen.push(day);
            if seen.len() == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(!completed);
        assert_eq!(seen.len(), 3);

        let completed = r.for_each_day(&cal, |_| ControlFlow::Continue(()));
        assert!(completed);
    }

    #[test]
    fn days_iterator_is_not_restartable() {
        let cal = ZonedCalendar::utc();
        let r = range(utc(2025, 3, 1, 0), utc(2025, 3, 3, 0));
        let mut days = r.days(&cal);
        assert_eq!(days.by_ref().count(), 2);
        assert_eq!(days.next(), None);
    }

    #[test]
    fn months_between_uses_calendar() {
        let cal = ZonedCalendar::utc();
        let r = range(utc(2025, 1, 1, 0), utc(2025, 3, 31, 0));
        assert_eq!(r.components_between(CalendarUnit::Month, &cal), 2);
        assert_eq!(r.components_between(CalendarUnit::Day, &cal), 89);
    }

    #[test]
    fn serde_roundtrip_and_validation() {
        let r = range(utc(2025, 3, 1, 0), utc(2025, 3, 5, 0));
        let json = serde_json::to_string(&r).unwrap();
        let parsed: DateRange = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);

        let inverted = r#"{"start":"2025-03-05T00:00:00Z","end":"2025-03-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<DateRange>(inverted).is_err());
    }

    #[test]
    fn display_is_half_open() {
        let r = range(utc(2025, 3, 1, 0), utc(2025, 3, 2, 0));
        assert_eq!(
            r.to_string(),
            "[2025-03-01T00:00:00+00:00, 2025-03-02T00:00:00+00:00)"
        );
    }
}
