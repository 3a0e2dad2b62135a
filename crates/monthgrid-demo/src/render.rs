//! Plain-text rendering of a month grid and a day listing.
//!
//! Both renderers only talk to a [`CalendarDataSource`], the same way a
//! graphical widget would.

use chrono::{DateTime, Datelike, Utc};
use monthgrid_core::{CalendarSystem, CalendarUnit, DateRange};
use monthgrid_loader::CalendarDataSource;

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// Shown instead of a time for an event continuing past the day's edge.
const CONTINUED: &str = "...";

/// The span a month grid shows: whole weeks, Monday first, covering the
/// month containing `at`.
pub fn month_grid<C: CalendarSystem>(calendar: &C, at: DateTime<Utc>) -> DateRange {
    let month = calendar.start_of_month(at);
    let next = calendar.start_of_next_month(month);
    let lead = calendar.to_local(month).weekday().num_days_from_monday();
    let days = calendar.difference(CalendarUnit::Day, month, next);
    let cells = (i64::from(lead) + days + 6) / 7 * 7;

    let start = calendar
        .add(CalendarUnit::Day, -(lead as i32), month)
        .unwrap_or(month);
    let end = i32::try_from(cells)
        .ok()
        .and_then(|cells| calendar.add(CalendarUnit::Day, cells, start))
        .unwrap_or(next);
    DateRange::new(start, end)
}

/// Renders the month containing `at` as a week grid. Days with events
/// carry a `*`.
pub fn render_month<D, C>(data: &D, calendar: &C, at: DateTime<Utc>) -> String
where
    D: CalendarDataSource,
    C: CalendarSystem,
{
    let month = calendar.start_of_month(at);
    let mut lines = vec![calendar.to_local(month).format("%B %Y").to_string()];
    lines.push(
        WEEKDAYS
            .iter()
            .map(|name| format!("{name:>3} "))
            .collect::<String>()
            .trim_end()
            .to_string(),
    );

    let mut week = String::new();
    for (index, day) in month_grid(calendar, month).days(calendar).enumerate() {
        let marker = if data.number_of_events(day) > 0 { '*' } else { ' ' };
        week.push_str(&format!("{:>3}{}", calendar.to_local(day).day(), marker));
        if index % 7 == 6 {
            lines.push(week.trim_end().to_string());
            week.clear();
        }
    }

    lines.join("\n")
}

/// Renders the events of the day containing `at`, one per line.
pub fn render_day<D, C>(data: &D, calendar: &C, at: DateTime<Utc>) -> String
where
    D: CalendarDataSource,
    C: CalendarSystem,
{
    let day = calendar.start_of_day(at);
    let next = calendar.next_day(day);
    let mut lines = vec![calendar.to_local(day).format("%A %-d %B %Y").to_string()];

    let count = data.number_of_events(day);
    if count == 0 {
        lines.push("  No events".to_string());
    }
    for index in 0..count {
        let Some(range) = data.event_range(index, day) else {
            continue;
        };
        let cell = data.cell_for_event(index, day);
        let start = if range.start() < day {
            CONTINUED.to_string()
        } else {
            calendar.to_local(range.start()).format("%H:%M").to_string()
        };
        let end = if range.end() > next {
            CONTINUED.to_string()
        } else {
            calendar.to_local(range.end()).format("%H:%M").to_string()
        };

        let mut line = format!("  {start:<5} - {end:<5}  {}", cell.title);
        if let Some(color) = cell.color {
            line.push_str(&format!(" [{color}]"));
        }
        lines.push(line);
    }

    lines.join("\n")
}
