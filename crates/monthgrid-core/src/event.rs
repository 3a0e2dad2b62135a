//! Event types.
//!
//! - [`CalendarInfo`]: the sub-calendar an event belongs to (id, name, color)
//! - [`CalendarEvent`]: a source-agnostic event with UTC start/end instants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarSystem;
use crate::range::DateRange;

/// A sub-calendar owning events, with its display color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarInfo {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Display color (e.g. `#1e88e5`).
    pub color: Option<String>,
}

impl CalendarInfo {
    /// Creates a sub-calendar without a color.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
        }
    }

    /// Builder: set the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A calendar event as delivered by an event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Source-specific identifier.
    pub id: String,
    /// Event title.
    pub title: String,
    /// Start instant (inclusive).
    pub start: DateTime<Utc>,
    /// End instant (exclusive). Never before `start`.
    pub end: DateTime<Utc>,
    /// Whether the event is an all-day event.
    pub all_day: bool,
    /// Owning sub-calendar.
    pub calendar: CalendarInfo,
}

impl CalendarEvent {
    /// Creates an event. An end before the start is clamped to the start.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        calendar: CalendarInfo,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end: end.max(start),
            all_day: false,
            calendar,
        }
    }

    /// Builder: mark as an all-day event.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// The exact `[start, end)` span of the event.
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    /// The span of days the event occupies, starting at the start of its
    /// first day.
    ///
    /// A zero-length event still occupies the day it starts on.
    pub fn occupied_days<C: CalendarSystem>(&self, calendar: &C) -> DateRange {
        let first = calendar.start_of_day(self.start);
        if self.end > first && self.end > self.start {
            DateRange::new(first, self.end)
        } else {
            DateRange::new(first, calendar.next_day(first))
        }
    }

    /// The display color of the owning sub-calendar.
    pub fn color(&self) -> Option<&str> {
        self.calendar.color.as_deref()
    }
}
