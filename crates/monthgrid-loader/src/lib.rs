//! Month cache, load queue, drain worker and visible-range tracking.
//!
//! This crate keeps a scrollable calendar view's visible window in sync
//! with a per-month event cache:
//!
//! - [`CalendarController`] owns the [`MonthCache`], the [`LoadQueue`] and
//!   the last visible range, and serves the widget through
//!   [`CalendarDataSource`] and [`CalendarDelegate`]
//! - [`MonthLoader`] is the single background worker fetching one month at
//!   a time from an [`EventSource`](monthgrid_sources::EventSource)
//! - [`RefreshSink`] tells the widget which days to redraw
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use monthgrid_core::{DateRange, ZonedCalendar};
//! use monthgrid_loader::{CalendarController, RefreshSignal};
//! use monthgrid_sources::MemorySource;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (refresh_tx, _refresh_rx) = mpsc::unbounded_channel::<RefreshSignal>();
//!     let source = Arc::new(MemorySource::new("memory"));
//!     let mut controller = CalendarController::new(ZonedCalendar::utc(), source, refresh_tx);
//!
//!     let calendar = ZonedCalendar::utc();
//!     let visible = DateRange::month(&calendar, chrono::Utc::now());
//!     controller.visible_range_changed(Some(visible));
//!     controller.run_until_idle().await?;
//!     Ok(())
//! }
//! ```

mod bucket;
mod cache;
mod config;
mod controller;
mod error;
mod loader;
mod queue;
mod widget;

pub use bucket::bucket_events;
pub use cache::{DayMap, MonthCache};
pub use config::{DEFAULT_NEW_EVENT_TITLE, LoaderConfig};
pub use controller::{CalendarController, LoaderStats, RequestState, UiEvent};
pub use error::{LoaderError, LoaderResult};
pub use loader::{
    FetchOutcome, LoadRequest, LoadedMonth, LoaderCommand, MonthLoader, WorkerMessage,
};
pub use queue::{LoadQueue, QueuePolicy};
pub use widget::{CalendarDataSource, CalendarDelegate, EventCell, RefreshSignal, RefreshSink};
