//! EventSource trait and implementations.
//!
//! This crate provides the abstraction layer between the month loader and
//! whatever stores events:
//!
//! - [`EventSource`] - The trait every event store implements
//! - [`MemorySource`] - Events held in memory (demo data, tests)
//! - [`IcsSource`] - Events parsed from an iCalendar file (feature `ics`)
//! - [`ErrorSource`] - A source that always fails
//! - [`SourceError`] - Error types for source operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Vec in memory  │    │   .ics file     │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │  MemorySource   │    │   IcsSource     │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │     EventSource      │
//!          └──────────┬───────────┘
//!                     │ fetch_events(range, filter)
//!                     ▼
//!             ┌────────────────┐
//!             │ CalendarEvent  │
//!             └────────────────┘
//! ```

pub mod error;
#[cfg(feature = "ics")]
pub mod ics;
pub mod memory;
pub mod source;

pub use error::{SourceError, SourceErrorCode, SourceResult};
#[cfg(feature = "ics")]
pub use ics::IcsSource;
pub use memory::MemorySource;
pub use source::{
    AccessStatus, BoxFuture, ErrorSource, EventFilter, EventSource, overlaps, select_events,
};
