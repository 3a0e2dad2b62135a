//! Core types: date ranges, calendar systems, events, tracing

pub mod calendar;
pub mod event;
pub mod range;
pub mod tracing;

pub use calendar::{
    CalendarError, CalendarSystem, CalendarUnit, ZonedCalendar, start_of_day, start_of_month,
    start_of_next_month,
};
pub use event::{CalendarEvent, CalendarInfo};
pub use range::{DateRange, Days, RangeError};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
