//! Interfaces between the controller and a rendering widget.
//!
//! - [`CalendarDataSource`]: what the widget asks for when it lays out a day
//! - [`CalendarDelegate`]: notifications the widget sends back
//! - [`RefreshSink`]: how the controller tells the widget to re-query days

use chrono::{DateTime, Utc};
use monthgrid_core::DateRange;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

/// Renderable content of an event cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCell {
    /// Text shown in the cell.
    pub title: String,
    /// Sub-calendar color, if any.
    pub color: Option<String>,
}

impl EventCell {
    /// Creates a cell.
    pub fn new(title: impl Into<String>, color: Option<String>) -> Self {
        Self {
            title: title.into(),
            color,
        }
    }

    /// An empty cell returned for indexes that do not exist.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Returns true for the placeholder cell.
    pub fn is_placeholder(&self) -> bool {
        self.title.is_empty() && self.color.is_none()
    }
}

/// Data the widget pulls for a day.
///
/// Lookups never fail: an index past the end of a day yields a
/// placeholder or `None`.
pub trait CalendarDataSource {
    /// Number of events on the day containing `date`.
    fn number_of_events(&self, date: DateTime<Utc>) -> usize;

    /// Span of the `index`th event of the day.
    fn event_range(&self, index: usize, date: DateTime<Utc>) -> Option<DateRange>;

    /// Cell content for the `index`th event of the day.
    fn cell_for_event(&self, index: usize, date: DateTime<Utc>) -> EventCell;

    /// Whether the user may drag the event to another day.
    fn can_move_event(&self, index: usize, date: DateTime<Utc>) -> bool;

    /// Seed content for an event the user is creating on `date`.
    fn cell_for_new_event(&self, date: DateTime<Utc>) -> EventCell;
}

/// Notifications from the widget. Every method defaults to doing nothing.
pub trait CalendarDelegate {
    /// The visible span changed. `None` when nothing is laid out yet.
    fn did_scroll(&mut self, _visible: Option<DateRange>) {}

    /// The widget scrolled to show `date` at the top.
    fn did_show_date(&mut self, _date: DateTime<Utc>) {}

    /// A day cell was tapped.
    fn did_select_day(&mut self, _date: DateTime<Utc>) {}

    /// An event cell was selected.
    fn did_select_event(&mut self, _index: usize, _date: DateTime<Utc>) {}

    /// An event cell was deselected.
    fn did_deselect_event(&mut self, _index: usize, _date: DateTime<Utc>) {}

    /// The user dragged into another month.
    fn did_move_month(&mut self, _month: DateTime<Utc>) {}
}

/// What the widget has to redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "range", rename_all = "snake_case")]
pub enum RefreshSignal {
    /// Re-query exactly the days in this range.
    Range(DateRange),
    /// Re-query everything.
    All,
}

/// Receiver of refresh signals.
pub trait RefreshSink: Send {
    /// The days in `range` changed.
    fn refresh(&self, range: DateRange);

    /// Everything changed.
    fn refresh_all(&self);
}

impl RefreshSink for mpsc::UnboundedSender<RefreshSignal> {
    fn refresh(&self, range: DateRange) {
        if self.send(RefreshSignal::Range(range)).is_err() {
            trace!(%range, "Widget gone, dropping refresh");
        }
    }

    fn refresh_all(&self) {
        if self.send(RefreshSignal::All).is_err() {
            trace!("Widget gone, dropping full refresh");
        }
    }
}
