//! EventSource trait definition.
//!
//! An [`EventSource`] turns a [`DateRange`] into the list of events that
//! overlap it. Sources also own the permission gate: the loader asks
//! [`EventSource::access_status`] before every fetch and treats anything
//! but [`AccessStatus::Granted`] as an empty result.

use std::future::Future;
use std::pin::Pin;

use monthgrid_core::{CalendarEvent, CalendarInfo, DateRange};
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};

/// A boxed future for async trait methods.
///
/// Keeps [`EventSource`] object safe so hosts can hold `Arc<dyn EventSource>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Authorization state of a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// Access granted.
    Granted,
    /// Access refused or revoked.
    Denied,
}

impl AccessStatus {
    /// Returns true if events may be read.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Which sub-calendars a fetch should include.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only include these sub-calendar ids. `None` means all.
    pub calendar_ids: Option<Vec<String>>,
}

impl EventFilter {
    /// A filter that accepts every sub-calendar.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter that accepts only the given sub-calendars.
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            calendar_ids: Some(ids.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns true if events of `calendar` pass the filter.
    pub fn matches(&self, calendar: &CalendarInfo) -> bool {
        self.calendar_ids
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|id| *id == calendar.id))
    }
}

/// The event source abstraction consumed by the loader.
///
/// # Implementation Notes
///
/// - `fetch_events` is all-or-nothing: it returns every overlapping event or
///   an error, never a partial list
/// - Returned events should be ordered by start time
/// - Implementations must be `Send + Sync`; the loader calls them from its
///   worker task
pub trait EventSource: Send + Sync {
    /// Returns the name of this source (e.g. "memory", "ics").
    fn name(&self) -> &str;

    /// Current authorization state, without prompting.
    fn access_status(&self) -> AccessStatus;

    /// Resolves the permission gate, prompting if needed.
    fn request_access(&self) -> BoxFuture<'_, AccessStatus>;

    /// The sub-calendars this source knows about.
    fn calendars(&self) -> Vec<CalendarInfo>;

    /// The sub-calendar new events are created in.
    fn default_calendar(&self) -> Option<CalendarInfo> {
        self.calendars().into_iter().next()
    }

    /// Fetches every event overlapping `range` that passes `filter`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when access is denied or the store cannot be read.
    fn fetch_events(
        &self,
        range: DateRange,
        filter: EventFilter,
    ) -> BoxFuture<'_, SourceResult<Vec<CalendarEvent>>>;
}

/// Returns true if `event` overlaps `range`.
///
/// Zero-length events overlap when their instant lies inside the range.
pub fn overlaps(event: &CalendarEvent, range: &DateRange) -> bool {
    let span = event.range();
    if span.is_empty() {
        range.contains(event.start)
    } else {
        span.intersects(range)
    }
}

/// Selects the events overlapping `range` that pass `filter`, ordered by
/// start time then title.
pub fn select_events<'a, I>(events: I, range: &DateRange, filter: &EventFilter) -> Vec<CalendarEvent>
where
    I: IntoIterator<Item = &'a CalendarEvent>,
{
    let mut selected: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|event| filter.matches(&event.calendar) && overlaps(event, range))
        .cloned()
        .collect();
    selected.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
    selected
}

/// A source that always fails.
///
/// Stands in for a source that failed to initialize, and exercises the
/// loader's failure path.
#[derive(Debug)]
pub struct ErrorSource {
    name: String,
    error: SourceError,
}

impl ErrorSource {
    /// Creates a new error source.
    pub fn new(name: impl Into<String>, error: SourceError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn error(&self) -> SourceError {
        SourceError::new(self.error.code(), self.error.message()).with_source_name(&self.name)
    }
}

impl EventSource for ErrorSource {
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
        Vec::new()
    }

    fn fetch_events(
        &self,
        _range: DateRange,
        _filter: EventFilter,
    ) -> BoxFuture<'_, SourceResult<Vec<CalendarEvent>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }
}
