//! iCalendar file source.
//!
//! Parses the VEVENTs of an `.ics` file once at load time and serves them
//! like [`MemorySource`](crate::MemorySource). Floating times and all-day
//! dates are interpreted in the zone given at load; `TZID` parameters are
//! resolved through chrono-tz.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use monthgrid_core::{CalendarEvent, CalendarInfo, DateRange};
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::source::{AccessStatus, BoxFuture, EventFilter, EventSource, select_events};

/// An event source backed by an iCalendar file.
#[derive(Debug, Clone)]
pub struct IcsSource {
    name: String,
    path: Option<PathBuf>,
    calendar: CalendarInfo,
    events: Vec<CalendarEvent>,
}

impl IcsSource {
    /// Reads and parses an `.ics` file.
    ///
    /// The sub-calendar is named after the file stem.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read and an invalid-data
    /// error if it is not iCalendar.
    pub async fn load(path: impl AsRef<Path>, zone: Tz) -> SourceResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SourceError::io(format!("failed to read {}", path.display()))
                .with_source_name("ics")
                .with_cause(e)
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ics".to_string());
        let mut source = Self::from_content(&content, CalendarInfo::new(&stem, &stem), zone)?;
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    /// Parses iCalendar text into a source owning one sub-calendar.
    ///
    /// # Errors
    ///
    /// Returns an invalid-data error if the text is not iCalendar.
    pub fn from_content(content: &str, calendar: CalendarInfo, zone: Tz) -> SourceResult<Self> {
        let parsed = content.parse::<Calendar>().map_err(|e| {
            SourceError::invalid_data(format!("failed to parse iCalendar: {}", e))
                .with_source_name("ics")
        })?;

        let events: Vec<CalendarEvent> = parsed
            .iter()
            .filter_map(|component| match component {
                CalendarComponent::Event(event) => convert_event(event, &calendar, zone),
                _ => None,
            })
            .collect();
        debug!(calendar = %calendar.id, count = events.len(), "Parsed iCalendar events");

        Ok(Self {
            name: format!("ics:{}", calendar.id),
            path: None,
            calendar,
            events,
        })
    }

    /// Builder: replace the sub-calendar (e.g. to set a color).
    pub fn with_calendar(mut self, calendar: CalendarInfo) -> Self {
        for event in &mut self.events {
            event.calendar = calendar.clone();
        }
        self.name = format!("ics:{}", calendar.id);
        self.calendar = calendar;
        self
    }

    /// The file this source was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All parsed events.
    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }
}

impl EventSource for IcsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn access_status(&self) -> AccessStatus {
        AccessStatus::Granted
    }

    fn request_access(&self) -> BoxFuture<'_, AccessStatus> {
        Box::pin(async { AccessStatus::Granted })
    }

    fn calendars(&self) -> Vec<CalendarInfo> {
        vec![self.calendar.clone()]
    }

    fn fetch_events(
        &self,
        range: DateRange,
        filter: EventFilter,
    ) -> BoxFuture<'_, SourceResult<Vec<CalendarEvent>>> {
        let selected = select_events(&self.events, &range, &filter);
        Box::pin(async move { Ok(selected) })
    }
}

/// Converts a VEVENT, skipping events without UID or start.
fn convert_event(event: &Event, calendar: &CalendarInfo, zone: Tz) -> Option<CalendarEvent> {
    let uid = event.get_uid()?;
    let dtstart = event.get_start()?;
    let all_day = matches!(dtstart, DatePerhapsTime::Date(_));

    let Some(start) = resolve(&dtstart, zone) else {
        warn!(uid, "Skipping event with unresolvable start");
        return None;
    };
    let end = match event.get_end() {
        Some(dtend) => resolve(&dtend, zone).unwrap_or(start),
        // All-day events without DTEND last one day; timed ones are instants.
        None if all_day => match dtstart {
            DatePerhapsTime::Date(date) => date
                .checked_add_days(Days::new(1))
                .and_then(|next| local_to_utc(next.and_time(NaiveTime::MIN), zone))
                .unwrap_or(start),
            DatePerhapsTime::DateTime(_) => start,
        },
        None => start,
    };

    let title = event.get_summary().unwrap_or("(untitled)");
    Some(CalendarEvent::new(uid, title, start, end, calendar.clone()).with_all_day(all_day))
}

fn resolve(value: &DatePerhapsTime, zone: Tz) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(date) => midnight(*date, zone),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(*dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => local_to_utc(*naive, zone),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let tz = tzid.parse::<Tz>().unwrap_or(zone);
            local_to_utc(*date_time, tz)
        }
    }
}

fn midnight(date: NaiveDate, zone: Tz) -> Option<DateTime<Utc>> {
    local_to_utc(date.and_time(NaiveTime::MIN), zone)
}

fn local_to_utc(local: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
