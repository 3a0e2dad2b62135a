//! Subcommand implementations. Each returns the text to print.

pub mod calendars;
pub mod config;
pub mod day;
pub mod month;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use monthgrid_core::CalendarSystem;

use crate::app::DemoCalendar;
use crate::error::{DemoError, DemoResult};

/// Parses `YYYY-MM` into the start of that month.
pub fn parse_month(calendar: &DemoCalendar, input: &str) -> DemoResult<DateTime<Utc>> {
    const EXPECTED: &str = "YYYY-MM";
    let date = NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d")
        .map_err(|_| DemoError::invalid_date(input, EXPECTED))?;
    let noon = local_noon(calendar, date).ok_or_else(|| DemoError::invalid_date(input, EXPECTED))?;
    Ok(calendar.start_of_month(noon))
}

/// Parses `YYYY-MM-DD` into the start of that day.
pub fn parse_day(calendar: &DemoCalendar, input: &str) -> DemoResult<DateTime<Utc>> {
    const EXPECTED: &str = "YYYY-MM-DD";
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| DemoError::invalid_date(input, EXPECTED))?;
    let noon = local_noon(calendar, date).ok_or_else(|| DemoError::invalid_date(input, EXPECTED))?;
    Ok(calendar.start_of_day(noon))
}

// Noon exists on every day, whatever the zone's transitions.
fn local_noon(calendar: &DemoCalendar, date: NaiveDate) -> Option<DateTime<Utc>> {
    let noon = date.and_hms_opt(12, 0, 0)?;
    calendar
        .timezone()
        .from_local_datetime(&noon)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
}
