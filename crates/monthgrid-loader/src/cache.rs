//! Month cache.
//!
//! Maps a month start to the events of every day in that month. The
//! presence of a month key means the month was fully fetched, even when
//! every day is empty. Eviction is all-or-nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use monthgrid_core::{CalendarEvent, CalendarSystem};
use tracing::debug;

/// Events per day start, in source order.
pub type DayMap = BTreeMap<DateTime<Utc>, Vec<Arc<CalendarEvent>>>;

/// Loaded months keyed by month start.
#[derive(Debug, Default)]
pub struct MonthCache {
    entries: HashMap<DateTime<Utc>, DayMap>,
}

impl MonthCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the day map of a loaded month.
    pub fn lookup(&self, month_start: DateTime<Utc>) -> Option<&DayMap> {
        self.entries.get(&month_start)
    }

    /// Returns true if the month has been loaded.
    pub fn contains(&self, month_start: DateTime<Utc>) -> bool {
        self.entries.contains_key(&month_start)
    }

    /// Inserts or replaces a month, returning the previous day map.
    pub fn publish(&mut self, month_start: DateTime<Utc>, days: DayMap) -> Option<DayMap> {
        let events: usize = days.values().map(Vec::len).sum();
        let previous = self.entries.insert(month_start, days);
        debug!(
            month = %month_start,
            events,
            replaced = previous.is_some(),
            "Published month"
        );
        previous
    }

    /// Removes every month. Returns how many were dropped.
    pub fn invalidate_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count, "Invalidated month cache");
        count
    }

    /// Events occurring on the day containing `date`.
    ///
    /// Empty when the month is not loaded or the day has no events.
    pub fn events_on_day<C: CalendarSystem>(
        &self,
        calendar: &C,
        date: DateTime<Utc>,
    ) -> &[Arc<CalendarEvent>] {
        let month = calendar.start_of_month(date);
        let day = calendar.start_of_day(date);
        self.entries
            .get(&month)
            .and_then(|days| days.get(&day))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Loaded month starts in ascending order.
    pub fn months(&self) -> Vec<DateTime<Utc>> {
        let mut months: Vec<_> = self.entries.keys().copied().collect();
        months.sort();
        months
    }

    /// Number of loaded months.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no month is loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
