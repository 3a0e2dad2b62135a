//! In-memory event source.
//!
//! Holds events in a vector behind an async lock. Used by the demo's sample
//! data and by tests, which can script the permission gate, add latency to
//! every fetch and inspect which ranges were requested.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use monthgrid_core::{CalendarEvent, CalendarInfo, DateRange};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::source::{AccessStatus, BoxFuture, EventFilter, EventSource, select_events};

/// An event source backed by memory.
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    calendars: Vec<CalendarInfo>,
    events: RwLock<Vec<CalendarEvent>>,
    access: AtomicU8,
    grant_on_request: bool,
    latency: Option<Duration>,
    fetches: AtomicUsize,
    fetched: Mutex<Vec<DateRange>>,
}

impl MemorySource {
    /// Creates an empty source with access already granted.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calendars: Vec::new(),
            events: RwLock::new(Vec::new()),
            access: AtomicU8::new(encode(AccessStatus::Granted)),
            grant_on_request: true,
            latency: None,
            fetches: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Builder: register a sub-calendar.
    pub fn with_calendar(mut self, calendar: CalendarInfo) -> Self {
        if !self.calendars.iter().any(|c| c.id == calendar.id) {
            self.calendars.push(calendar);
        }
        self
    }

    /// Builder: add an event, registering its sub-calendar if needed.
    pub fn with_event(mut self, event: CalendarEvent) -> Self {
        self = self.with_calendar(event.calendar.clone());
        self.events.get_mut().push(event);
        self
    }

    /// Builder: add several events.
    pub fn with_events<I>(self, events: I) -> Self
    where
        I: IntoIterator<Item = CalendarEvent>,
    {
        events.into_iter().fold(self, Self::with_event)
    }

    /// Builder: set the initial access status.
    pub fn with_access(self, status: AccessStatus) -> Self {
        self.access.store(encode(status), Ordering::SeqCst);
        self
    }

    /// Builder: whether `request_access` grants an undetermined status.
    pub fn with_grant_on_request(mut self, grant: bool) -> Self {
        self.grant_on_request = grant;
        self
    }

    /// Builder: sleep this long inside every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replaces the access status (e.g. the user revoked access).
    pub fn set_access(&self, status: AccessStatus) {
        self.access.store(encode(status), Ordering::SeqCst);
    }

    /// Adds an event after construction.
    pub async fn insert(&self, event: CalendarEvent) {
        self.events.write().await.push(event);
    }

    /// Number of `fetch_events` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Ranges passed to `fetch_events`, in call order.
    pub async fn fetched_ranges(&self) -> Vec<DateRange> {
        self.fetched.lock().await.clone()
    }
}

impl EventSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn access_status(&self) -> AccessStatus {
        decode(self.access.load(Ordering::SeqCst))
    }

    fn request_access(&self) -> BoxFuture<'_, AccessStatus> {
        Box::pin(async move {
            let current = self.access_status();
            if current != AccessStatus::NotDetermined {
                return current;
            }
            let resolved = if self.grant_on_request {
                AccessStatus::Granted
            } else {
                AccessStatus::Denied
            };
            self.set_access(resolved);
            debug!(source = %self.name, status = ?resolved, "Resolved access request");
            resolved
        })
    }

    fn calendars(&self) -> Vec<CalendarInfo> {
        self.calendars.clone()
    }

    fn fetch_events(
        &self,
        range: DateRange,
        filter: EventFilter,
    ) -> BoxFuture<'_, SourceResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.fetched.lock().await.push(range);

            if !self.access_status().is_granted() {
                return Err(SourceError::access_denied("calendar access not granted")
                    .with_source_name(&self.name));
            }

            let events = self.events.read().await;
            let selected = select_events(events.iter(), &range, &filter);
            debug!(source = %self.name, %range, count = selected.len(), "Fetched events");
            Ok(selected)
        })
    }
}

fn encode(status: AccessStatus) -> u8 {
    match status {
        AccessStatus::NotDetermined => 0,
        AccessStatus::Granted => 1,
        AccessStatus::Denied => 2,
    }
}

fn decode(raw: u8) -> AccessStatus {
    match raw {
        1 => AccessStatus::Granted,
        2 => AccessStatus::Denied,
        _ => AccessStatus::NotDetermined,
    }
}
