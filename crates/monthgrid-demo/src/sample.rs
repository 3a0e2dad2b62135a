//! Built-in sample calendar used when no `.ics` file is configured.
//!
//! Events are laid out relative to a month so that any month the demo
//! shows has something in it, including an event running into the next
//! month.

use chrono::{DateTime, Duration, Utc};
use monthgrid_core::{CalendarEvent, CalendarInfo, CalendarSystem, CalendarUnit};
use monthgrid_sources::MemorySource;

/// Sub-calendar for work events.
pub fn work() -> CalendarInfo {
    CalendarInfo::new("work", "Work").with_color("#1e88e5")
}

/// Sub-calendar for personal events.
pub fn home() -> CalendarInfo {
    CalendarInfo::new("home", "Home").with_color("#43a047")
}

/// Months after the anchor month that get sample events.
const FOLLOWING_MONTHS: i32 = 12;

/// Builds the sample source from the month before `around` to a year
/// after it.
pub fn sample_source<C: CalendarSystem>(calendar: &C, around: DateTime<Utc>) -> MemorySource {
    let month = calendar.start_of_month(around);
    let events = (-1..=FOLLOWING_MONTHS)
        .filter_map(|offset| calendar.add(CalendarUnit::Month, offset, month))
        .flat_map(|month| month_events(calendar, month))
        .collect::<Vec<_>>();

    MemorySource::new("sample")
        .with_calendar(work())
        .with_calendar(home())
        .with_events(events)
}

fn month_events<C: CalendarSystem>(calendar: &C, month: DateTime<Utc>) -> Vec<CalendarEvent> {
    let key = month.format("%Y%m").to_string();
    let at = |day: i32, hour: i64| {
        calendar
            .add(CalendarUnit::Day, day - 1, month)
            .map(|midnight| midnight + Duration::hours(hour))
    };
    let next_month = calendar.start_of_next_month(month);
    let last_day = calendar.add(CalendarUnit::Day, -1, next_month);

    let mut events = Vec::new();
    if let (Some(start), Some(end)) = (at(3, 9), at(3, 10)) {
        events.push(CalendarEvent::new(
            format!("planning-{key}"),
            "Sprint planning",
            start,
            end,
            work(),
        ));
    }
    if let (Some(start), Some(end)) = (at(12, 12), at(12, 13)) {
        events.push(CalendarEvent::new(
            format!("lunch-{key}"),
            "Lunch with Sam",
            start,
            end,
            home(),
        ));
    }
    if let (Some(start), Some(end)) = (at(12, 14), at(12, 15)) {
        events.push(CalendarEvent::new(
            format!("review-{key}"),
            "Design review",
            start,
            end,
            work(),
        ));
    }
    if let (Some(start), Some(end)) = (at(20, 0), at(21, 0)) {
        events.push(
            CalendarEvent::new(format!("release-{key}"), "Release day", start, end, work())
                .with_all_day(true),
        );
    }
    // Runs from the last day of the month into the second day of the next.
    if let Some(last_day) = last_day
        && let Some(end) = calendar.add(CalendarUnit::Day, 1, next_month)
    {
        events.push(CalendarEvent::new(
            format!("offsite-{key}"),
            "Team offsite",
            last_day + Duration::hours(8),
            end + Duration::hours(18),
            work(),
        ));
    }
    events
}
