//! Headless demo for the monthgrid loader.
//!
//! Drives a [`CalendarController`](monthgrid_loader::CalendarController)
//! the way a calendar widget would (scroll reports, day selection, refresh
//! handling) and prints what the widget would show.
//!
//! ```text
//!  cli ──▶ DemoConfig ──▶ Demo ──▶ CalendarController ──▶ MonthLoader
//!                          │             │                     │
//!                    sample / .ics       ▼                     ▼
//!                                  HeadlessWidget         EventSource
//!                                        │
//!                                        ▼
//!                                  render (text)
//! ```

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod headless;
pub mod render;
pub mod sample;
