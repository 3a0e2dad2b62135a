//! Partitioning of a month's events into day buckets.

use std::sync::Arc;

use monthgrid_core::{CalendarEvent, CalendarSystem, DateRange};

use crate::cache::DayMap;

/// Buckets `events` into the days of `month`.
///
/// Every day of the month gets an entry. An event is appended to each day
/// it occupies inside the month window; days outside the window are left to
/// the neighbouring month's own load.
pub fn bucket_events<C, I>(calendar: &C, month: &DateRange, events: I) -> DayMap
where
    C: CalendarSystem,
    I: IntoIterator<Item = CalendarEvent>,
{
    let mut days: DayMap = month.days(calendar).map(|day| (day, Vec::new())).collect();

    for event in events {
        let event = Arc::new(event);
        let Some(window) = event.occupied_days(calendar).intersection(month) else {
            continue;
        };
        for day in window.days(calendar) {
            days.entry(day).or_default().push(Arc::clone(&event));
        }
    }

    days
}
