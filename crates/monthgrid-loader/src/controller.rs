//! The owning context of the month cache.
//!
//! [`CalendarController`] holds every piece of mutable loader state: the
//! month cache, the load queue, the last visible range and the
//! visible-calendar filter. It is driven from one context (the UI side):
//! the host calls its methods and pumps worker messages, either with
//! [`CalendarController::process_next`] and friends or by handing it to
//! [`CalendarController::run`].
//!
//! Requests move through [`RequestState`]:
//!
//! ```text
//! Queued ──▶ Fetching ──▶ Published
//!    │
//!    └─────▶ Superseded   (month left the visible range before its turn)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use monthgrid_core::{CalendarEvent, CalendarSystem, CalendarUnit, DateRange};
use monthgrid_sources::{AccessStatus, EventFilter, EventSource};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::cache::{DayMap, MonthCache};
use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::loader::{LoadRequest, LoadedMonth, LoaderCommand, MonthLoader, WorkerMessage};
use crate::queue::LoadQueue;
use crate::widget::{CalendarDataSource, CalendarDelegate, EventCell, RefreshSink};

/// Where a month's load request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Waiting in the queue.
    Queued,
    /// Handed to the worker.
    Fetching,
    /// In the cache.
    Published,
    /// Dropped at dequeue time because it was no longer visible.
    Superseded,
}

/// Counters over the controller's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderStats {
    /// Requests appended to the queue.
    pub enqueued: u64,
    /// Requests dropped because the month was already pending.
    pub deduplicated: u64,
    /// Requests dropped at dequeue time.
    pub superseded: u64,
    /// Months written to the cache.
    pub published: u64,
    /// Loaded months dropped because the cache was invalidated meanwhile.
    pub discarded: u64,
}

/// UI-side events accepted by [`CalendarController::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The widget's visible span changed.
    VisibleRangeChanged(Option<DateRange>),
    /// The widget scrolled to a date.
    ShowDate(DateTime<Utc>),
    /// A day was tapped.
    SelectDay(DateTime<Utc>),
    /// Restrict loading to these sub-calendars (`None` for all).
    SetVisibleCalendars(Option<Vec<String>>),
    /// Drop the cache and load the visible months again.
    Reload,
    /// Leave the event loop.
    Shutdown,
}

/// Owner of the month cache and driver of the drain worker.
pub struct CalendarController<C: CalendarSystem> {
    calendar: C,
    source: Arc<dyn EventSource>,
    config: LoaderConfig,
    cache: MonthCache,
    queue: LoadQueue,
    states: HashMap<DateTime<Utc>, RequestState>,
    visible: Option<DateRange>,
    filter: EventFilter,
    generation: u64,
    stats: LoaderStats,
    refresh: Box<dyn RefreshSink>,
    commands: mpsc::Sender<LoaderCommand>,
    messages: mpsc::UnboundedReceiver<WorkerMessage<C>>,
    worker: Option<JoinHandle<()>>,
    worker_busy: bool,
    title: Option<String>,
    selected_day: Option<DateTime<Utc>>,
}

impl<C: CalendarSystem> CalendarController<C> {
    /// Creates a controller with the default configuration and spawns its
    /// worker. Must be called inside a tokio runtime.
    pub fn new(
        calendar: C,
        source: Arc<dyn EventSource>,
        refresh: impl RefreshSink + 'static,
    ) -> Self {
        Self::build(calendar, source, Box::new(refresh), LoaderConfig::default())
    }

    /// Creates a controller with `config` and spawns its worker. Must be
    /// called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::Config` if the configuration is invalid.
    pub fn with_config(
        calendar: C,
        source: Arc<dyn EventSource>,
        refresh: impl RefreshSink + 'static,
        config: LoaderConfig,
    ) -> LoaderResult<Self> {
        config.validate()?;
        Ok(Self::build(calendar, source, Box::new(refresh), config))
    }

    fn build(
        calendar: C,
        source: Arc<dyn EventSource>,
        refresh: Box<dyn RefreshSink>,
        config: LoaderConfig,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel(config.command_buffer);
        let (owner, messages) = mpsc::unbounded_channel();
        let worker = MonthLoader::new(Arc::clone(&source), command_rx, owner).spawn();

        info!(
            calendar = %calendar.identifier(),
            source = source.name(),
            policy = config.queue_policy.as_str(),
            "Calendar controller created"
        );

        Self {
            calendar,
            source,
            queue: LoadQueue::new(config.queue_policy),
            config,
            cache: MonthCache::new(),
            states: HashMap::new(),
            visible: None,
            filter: EventFilter::all(),
            generation: 0,
            stats: LoaderStats::default(),
            refresh,
            commands,
            messages,
            worker: Some(worker),
            worker_busy: false,
            title: None,
            selected_day: None,
        }
    }

    /// The calendar used for month and day boundaries.
    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// The event source.
    pub fn source(&self) -> &Arc<dyn EventSource> {
        &self.source
    }

    /// The configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The month cache.
    pub fn cache(&self) -> &MonthCache {
        &self.cache
    }

    /// Lifetime counters.
    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    /// Current cache generation. Bumped by every invalidation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The last visible range reported by the widget.
    pub fn visible_range(&self) -> Option<DateRange> {
        self.visible
    }

    /// The visible-calendar filter.
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Number of requests waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns true when no request is queued or in flight.
    pub fn is_idle(&self) -> bool {
        !self.worker_busy
    }

    /// State of the latest request for the month containing `date`.
    ///
    /// Only queued, in-flight and superseded months are tracked; a cached
    /// month reports `Published`. Superseded entries last until the next
    /// visible-range change, so tracking never outgrows the queue plus one
    /// scroll's worth of months.
    pub fn request_state(&self, date: DateTime<Utc>) -> Option<RequestState> {
        let month = self.calendar.start_of_month(date);
        self.states
            .get(&month)
            .copied()
            .or_else(|| self.cache.contains(month).then_some(RequestState::Published))
    }

    /// Title recorded by the last `did_show_date`, as `YYYY/MM/DD`.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Day recorded by the last `did_select_day`.
    pub fn selected_day(&self) -> Option<DateTime<Utc>> {
        self.selected_day
    }

    /// Day map of the month containing `date`, if loaded.
    pub fn month_days(&self, date: DateTime<Utc>) -> Option<&DayMap> {
        self.cache.lookup(self.calendar.start_of_month(date))
    }

    /// Events occurring on the day containing `date`.
    pub fn events_on_day(&self, date: DateTime<Utc>) -> &[Arc<CalendarEvent>] {
        self.cache.events_on_day(&self.calendar, date)
    }

    /// The `index`th event on the day containing `date`.
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::IndexOutOfRange` past the end of the day.
    pub fn event_at(&self, index: usize, date: DateTime<Utc>) -> LoaderResult<&Arc<CalendarEvent>> {
        let events = self.events_on_day(date);
        events.get(index).ok_or_else(|| {
            LoaderError::index_out_of_range(index, events.len(), self.calendar.start_of_day(date))
        })
    }

    /// Resolves the source's permission gate.
    ///
    /// On grant every sub-calendar is selected and the visible months are
    /// reloaded.
    pub async fn attach(&mut self) -> AccessStatus {
        let source = Arc::clone(&self.source);
        let status = source.request_access().await;
        if status.is_granted() {
            info!(source = source.name(), "Calendar access granted");
            self.filter = EventFilter::all();
            self.reload_events();
        } else {
            info!(source = source.name(), ?status, "Calendar access not granted");
        }
        status
    }

    /// Records a new visible range and queues the uncached months in it.
    ///
    /// Repeating the current range does nothing.
    pub fn visible_range_changed(&mut self, visible: Option<DateRange>) {
        if self.visible == visible {
            trace!("Visible range unchanged");
            return;
        }
        match visible {
            Some(range) => debug!(%range, "Visible range changed"),
            None => debug!("Visible range cleared"),
        }
        self.visible = visible;
        self.states
            .retain(|_, state| *state != RequestState::Superseded);
        self.load_events_if_needed();
    }

    /// Queues every visible month that is not cached yet.
    pub fn load_events_if_needed(&mut self) {
        let Some(visible) = self.visible else {
            return;
        };
        for month in self.months_in(&visible) {
            if !self.cache.contains(month) {
                self.enqueue(month);
            }
        }
    }

    /// Appends the month containing `date` to the load queue and wakes
    /// the worker.
    ///
    /// Returns false when the queue dropped it as a duplicate.
    pub fn enqueue(&mut self, date: DateTime<Utc>) -> bool {
        let month = self.calendar.start_of_month(date);
        let queued = self.queue.push(month);
        if queued {
            self.stats.enqueued += 1;
            self.states.insert(month, RequestState::Queued);
            debug!(month = %month, pending = self.queue.len(), "Enqueued month");
        } else {
            self.stats.deduplicated += 1;
            trace!(month = %month, "Month already pending");
        }
        self.wake();
        queued
    }

    /// Drops every cached month and starts a new generation.
    ///
    /// Months already handed to the worker are discarded when they arrive.
    pub fn invalidate_all(&mut self) {
        let dropped = self.cache.invalidate_all();
        self.generation += 1;
        self.states
            .retain(|_, state| matches!(state, RequestState::Queued | RequestState::Fetching));
        debug!(dropped, generation = self.generation, "Cache invalidated");
    }

    /// Invalidates the cache, repaints everything and reloads the visible
    /// months.
    pub fn reload_events(&mut self) {
        self.invalidate_all();
        self.refresh.refresh_all();
        self.load_events_if_needed();
    }

    /// Restricts loading to the given sub-calendars (`None` for all) and
    /// reloads.
    pub fn set_visible_calendars(&mut self, ids: Option<Vec<String>>) {
        self.filter = EventFilter { calendar_ids: ids };
        debug!(filter = ?self.filter.calendar_ids, "Visible calendars changed");
        self.reload_events();
    }

    /// Switches to another calendar and reloads.
    ///
    /// Queued months are keyed by the old calendar's boundaries, so they are
    /// dropped as superseded.
    pub fn set_calendar(&mut self, calendar: C) {
        for month in self.queue.clear() {
            self.states.insert(month, RequestState::Superseded);
            self.stats.superseded += 1;
        }
        info!(calendar = %calendar.identifier(), "Calendar changed");
        self.calendar = calendar;
        self.reload_events();
    }

    /// Waits for one worker message and handles it.
    ///
    /// Returns false when the worker is gone.
    pub async fn process_next(&mut self) -> bool {
        match self.messages.recv().await {
            Some(message) => {
                self.handle_message(message);
                true
            }
            None => false,
        }
    }

    /// Handles every worker message already waiting. Returns how many.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.messages.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Pumps worker messages until the queue is drained.
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::WorkerGone` if the worker exited first.
    pub async fn run_until_idle(&mut self) -> LoaderResult<()> {
        while self.worker_busy {
            if !self.process_next().await {
                self.worker_busy = false;
                return Err(LoaderError::WorkerGone);
            }
        }
        Ok(())
    }

    /// Runs the controller's event loop until `Shutdown`, until `events`
    /// closes or until the worker exits.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<UiEvent>) {
        info!("Calendar controller running");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(UiEvent::Shutdown) | None => break,
                    Some(event) => self.handle_ui_event(event),
                },
                message = self.messages.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => {
                        warn!("Month loader exited unexpectedly");
                        break;
                    }
                },
            }
        }
        info!("Calendar controller stopped");
    }

    /// Stops the worker and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.commands.try_send(LoaderCommand::Stop) {
            trace!(error = %e, "Stop not delivered, closing channels instead");
        }
        // Dropping the queued replies unblocks a worker waiting for one.
        self.messages.close();
        while self.messages.try_recv().is_ok() {}
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            warn!(error = %e, "Month loader task failed");
        }
    }

    fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::VisibleRangeChanged(visible) => self.did_scroll(visible),
            UiEvent::ShowDate(date) => self.did_show_date(date),
            UiEvent::SelectDay(date) => self.did_select_day(date),
            UiEvent::SetVisibleCalendars(ids) => self.set_visible_calendars(ids),
            UiEvent::Reload => self.reload_events(),
            UiEvent::Shutdown => {}
        }
    }

    fn handle_message(&mut self, message: WorkerMessage<C>) {
        match message {
            WorkerMessage::NextRequest { reply } => {
                let request = self.next_request();
                if request.is_none() {
                    self.worker_busy = false;
                    trace!("Load queue drained");
                }
                if reply.send(request).is_err() {
                    warn!("Month loader dropped its request");
                }
            }
            WorkerMessage::Loaded(loaded) => self.publish(loaded),
        }
    }

    /// Pops the queue until a month still in view turns up.
    fn next_request(&mut self) -> Option<LoadRequest<C>> {
        while let Some(month) = self.queue.pop() {
            let range = self.calendar.month_range(month);
            if !self.is_visible(&range) {
                self.states.insert(month, RequestState::Superseded);
                self.stats.superseded += 1;
                debug!(month = %month, "Month scrolled out of view, superseded");
                continue;
            }
            self.states.insert(month, RequestState::Fetching);
            return Some(LoadRequest {
                month,
                range,
                calendar: self.calendar.clone(),
                filter: self.filter.clone(),
                generation: self.generation,
            });
        }
        None
    }

    fn publish(&mut self, loaded: LoadedMonth) {
        let LoadedMonth {
            month,
            range,
            days,
            generation,
            ..
        } = loaded;

        if self.states.get(&month) == Some(&RequestState::Fetching) {
            self.states.remove(&month);
        }
        if generation != self.generation {
            self.stats.discarded += 1;
            debug!(
                month = %month,
                generation,
                current = self.generation,
                "Discarding month loaded before invalidation"
            );
            return;
        }

        self.cache.publish(month, days);
        self.stats.published += 1;
        self.refresh.refresh(range);
    }

    /// A month is still wanted when its window meets the visible range.
    /// Without a recorded range every month is.
    fn is_visible(&self, window: &DateRange) -> bool {
        self.visible.is_none_or(|visible| {
            window.intersects(&visible) || (visible.is_empty() && window.contains(visible.start()))
        })
    }

    /// Month starts spanned by `visible`, first to last.
    fn months_in(&self, visible: &DateRange) -> Vec<DateTime<Utc>> {
        let first = self.calendar.start_of_month(visible.start());
        let count = self
            .calendar
            .difference(CalendarUnit::Month, first, visible.end())
            .max(0);
        (0..=count)
            .filter_map(|offset| {
                let offset = i32::try_from(offset).ok()?;
                self.calendar.add(CalendarUnit::Month, offset, first)
            })
            .filter(|month| self.is_visible(&self.calendar.month_range(*month)))
            .collect()
    }

    fn wake(&mut self) {
        match self.commands.try_send(LoaderCommand::Wake) {
            // A full buffer already holds a wake.
            Ok(()) | Err(TrySendError::Full(_)) => self.worker_busy = true,
            Err(TrySendError::Closed(_)) => warn!("Month loader is not running"),
        }
    }

}

impl<C: CalendarSystem> CalendarDataSource for CalendarController<C> {
    fn number_of_events(&self, date: DateTime<Utc>) -> usize {
        self.events_on_day(date).len()
    }

    fn event_range(&self, index: usize, date: DateTime<Utc>) -> Option<DateRange> {
        self.events_on_day(date).get(index).map(|event| event.range())
    }

    fn cell_for_event(&self, index: usize, date: DateTime<Utc>) -> EventCell {
        match self.event_at(index, date) {
            Ok(event) => EventCell::new(event.title.clone(), event.color().map(str::to_string)),
            Err(e) => {
                trace!(error = %e, "No event for cell");
                EventCell::placeholder()
            }
        }
    }

    fn can_move_event(&self, _index: usize, _date: DateTime<Utc>) -> bool {
        false
    }

    fn cell_for_new_event(&self, _date: DateTime<Utc>) -> EventCell {
        let color = self
            .source
            .default_calendar()
            .and_then(|calendar| calendar.color);
        EventCell::new(self.config.new_event_title.clone(), color)
    }
}

impl<C: CalendarSystem> CalendarDelegate for CalendarController<C> {
    fn did_scroll(&mut self, visible: Option<DateRange>) {
        self.visible_range_changed(visible);
    }

    fn did_show_date(&mut self, date: DateTime<Utc>) {
        let title = self.calendar.to_local(date).format("%Y/%m/%d").to_string();
        debug!(%title, "Showing date");
        self.title = Some(title);
    }

    fn did_select_day(&mut self, date: DateTime<Utc>) {
        let day = self.calendar.start_of_day(date);
        debug!(day = %day, events = self.events_on_day(day).len(), "Day selected");
        self.selected_day = Some(day);
    }

    fn did_move_month(&mut self, month: DateTime<Utc>) {
        debug!(month = %self.calendar.start_of_month(month), "Moved to month");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::queue::QueuePolicy;
    use crate::widget::RefreshSignal;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use monthgrid_core::{CalendarInfo, ZonedCalendar};
    use monthgrid_sources::{ErrorSource, MemorySource, SourceError};

    type Calendar = ZonedCalendar<Tz>;

    fn utc(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, h, 0, 0).unwrap()
    }

    fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> DateRange {
        DateRange::new(start, end)
    }

    fn month(m: u32) -> DateRange {
        ZonedCalendar::utc().month_range(utc(m, 1, 0))
    }

    fn work() -> CalendarInfo {
        CalendarInfo::new("work", "Work").with_color("#1e88e5")
    }

    fn home() -> CalendarInfo {
        CalendarInfo::new("home", "Home").with_color("#43a047")
    }

    fn sample_source() -> MemorySource {
        MemorySource::new("memory").with_events([
            CalendarEvent::new("standup", "Standup", utc(3, 3, 9), utc(3, 3, 10), work()),
            CalendarEvent::new("offsite", "Offsite", utc(3, 30, 8), utc(4, 2, 18), work()),
            CalendarEvent::new("dentist", "Dentist", utc(4, 10, 14), utc(4, 10, 15), home()),
            CalendarEvent::new("review", "Review", utc(1, 15, 10), utc(1, 15, 11), work()),
            CalendarEvent::new("planning", "Planning", utc(2, 12, 10), utc(2, 12, 11), work()),
            CalendarEvent::new("picnic", "Picnic", utc(6, 5, 12), utc(6, 5, 15), home()),
        ])
    }

    fn sample() -> Arc<MemorySource> {
        Arc::new(sample_source())
    }

    struct Fixture {
        controller: CalendarController<Calendar>,
        refreshes: mpsc::UnboundedReceiver<RefreshSignal>,
    }

    impl Fixture {
        fn signals(&mut self) -> Vec<RefreshSignal> {
            let mut signals = Vec::new();
            while let Ok(signal) = self.refreshes.try_recv() {
                signals.push(signal);
            }
            signals
        }
    }

    fn fixture(source: Arc<dyn EventSource>) -> Fixture {
        fixture_with(source, LoaderConfig::default())
    }

    fn fixture_with(source: Arc<dyn EventSource>, config: LoaderConfig) -> Fixture {
        let (tx, refreshes) = mpsc::unbounded_channel();
        let controller =
            CalendarController::with_config(ZonedCalendar::new(Tz::UTC), source, tx, config)
                .unwrap();
        Fixture {
            controller,
            refreshes,
        }
    }

    fn ids(controller: &CalendarController<Calendar>, date: DateTime<Utc>) -> Vec<String> {
        controller
            .events_on_day(date)
            .iter()
            .map(|event| event.id.clone())
            .collect()
    }

    mod tracker {
        use super::*;

        #[tokio::test]
        async fn event_spanning_month_end_is_bucketed_in_fetched_month_only() {
            let source = sample();
            let mut f = fixture(source.clone());

            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(ids(&f.controller, utc(3, 30, 12)), vec!["offsite"]);
            assert_eq!(ids(&f.controller, utc(3, 31, 12)), vec!["offsite"]);
            assert!(ids(&f.controller, utc(4, 1, 12)).is_empty());

            assert_eq!(f.controller.cache().months(), vec![utc(3, 1, 0)]);
            assert_eq!(
                f.controller.request_state(utc(3, 15, 0)),
                Some(RequestState::Published)
            );
            assert_eq!(f.controller.request_state(utc(4, 15, 0)), None);
            assert_eq!(source.fetched_ranges().await, vec![month(3)]);
            assert_eq!(f.signals(), vec![RefreshSignal::Range(month(3))]);
        }

        #[tokio::test]
        async fn narrowing_the_range_supersedes_queued_month() {
            let source = sample();
            let mut f = fixture(source.clone());

            f.controller.enqueue(utc(1, 1, 0));
            f.controller.enqueue(utc(6, 1, 0));
            f.controller.enqueue(utc(2, 1, 0));
            f.controller
                .visible_range_changed(Some(range(utc(1, 10, 0), utc(2, 20, 0))));
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(
                f.controller.request_state(utc(1, 1, 0)),
                Some(RequestState::Published)
            );
            assert_eq!(
                f.controller.request_state(utc(6, 1, 0)),
                Some(RequestState::Superseded)
            );
            assert_eq!(
                f.controller.request_state(utc(2, 1, 0)),
                Some(RequestState::Published)
            );
            assert!(f.controller.month_days(utc(6, 1, 0)).is_none());

            let stats = f.controller.stats();
            assert_eq!(stats.enqueued, 3);
            assert_eq!(stats.deduplicated, 2);
            assert_eq!(stats.superseded, 1);
            assert_eq!(stats.published, 2);

            assert_eq!(source.fetched_ranges().await, vec![month(1), month(2)]);
            assert_eq!(
                f.signals(),
                vec![RefreshSignal::Range(month(1)), RefreshSignal::Range(month(2))]
            );
        }

        #[tokio::test]
        async fn fetch_in_flight_publishes_after_scrolling_away() {
            tokio::time::pause();
            let mut f = fixture(Arc::new(
                sample_source().with_latency(Duration::from_secs(2)),
            ));

            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            assert!(f.controller.process_next().await);
            assert_eq!(
                f.controller.request_state(utc(3, 1, 0)),
                Some(RequestState::Fetching)
            );

            f.controller
                .visible_range_changed(Some(range(utc(6, 1, 0), utc(6, 30, 0))));
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(
                f.controller.request_state(utc(3, 1, 0)),
                Some(RequestState::Published)
            );
            assert_eq!(ids(&f.controller, utc(3, 3, 9)), vec!["standup"]);
            assert_eq!(f.controller.stats().superseded, 0);
            assert_eq!(
                f.signals(),
                vec![RefreshSignal::Range(month(3)), RefreshSignal::Range(month(6))]
            );
        }

        #[tokio::test]
        async fn superseded_states_are_dropped_on_next_scroll() {
            let mut f = fixture(sample());
            f.controller.enqueue(utc(6, 1, 0));
            f.controller
                .visible_range_changed(Some(range(utc(1, 10, 0), utc(1, 20, 0))));
            f.controller.run_until_idle().await.unwrap();
            assert_eq!(
                f.controller.request_state(utc(6, 1, 0)),
                Some(RequestState::Superseded)
            );
            // Published months are answered from the cache.
            assert_eq!(f.controller.states.len(), 1);

            f.controller
                .visible_range_changed(Some(range(utc(3, 10, 0), utc(3, 20, 0))));
            f.controller.run_until_idle().await.unwrap();
            assert_eq!(f.controller.request_state(utc(6, 1, 0)), None);
            assert_eq!(
                f.controller.request_state(utc(1, 1, 0)),
                Some(RequestState::Published)
            );
            assert!(f.controller.states.is_empty());
        }

        #[tokio::test]
        async fn unchanged_range_is_a_no_op() {
            let source = sample();
            let mut f = fixture(source.clone());
            let visible = Some(range(utc(3, 1, 0), utc(3, 31, 0)));

            f.controller.visible_range_changed(visible);
            f.controller.visible_range_changed(visible);
            assert_eq!(f.controller.stats().enqueued, 1);
            assert_eq!(f.controller.stats().deduplicated, 0);

            f.controller.run_until_idle().await.unwrap();
            f.controller.visible_range_changed(visible);
            f.controller.run_until_idle().await.unwrap();
            assert_eq!(f.controller.stats().enqueued, 1);
            assert_eq!(source.fetch_count(), 1);
        }

        #[tokio::test]
        async fn cached_months_are_not_requested_again() {
            let source = sample();
            let mut f = fixture(source.clone());

            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            f.controller.run_until_idle().await.unwrap();

            f.controller
                .visible_range_changed(Some(range(utc(3, 5, 0), utc(3, 20, 0))));
            assert!(f.controller.is_idle());
            assert_eq!(f.controller.pending(), 0);

            f.controller
                .visible_range_changed(Some(range(utc(3, 20, 0), utc(4, 10, 0))));
            assert_eq!(f.controller.pending(), 1);
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(source.fetched_ranges().await, vec![month(3), month(4)]);
            assert_eq!(ids(&f.controller, utc(4, 10, 14)), vec!["dentist"]);
            assert_eq!(ids(&f.controller, utc(4, 1, 9)), vec!["offsite"]);
        }

        #[tokio::test]
        async fn range_ending_on_month_start_excludes_next_month() {
            let mut f = fixture(sample());
            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(4, 1, 0))));
            assert_eq!(f.controller.pending(), 1);
            assert_eq!(
                f.controller.request_state(utc(3, 1, 0)),
                Some(RequestState::Queued)
            );
            assert_eq!(f.controller.request_state(utc(4, 1, 0)), None);
        }

        #[tokio::test]
        async fn range_spanning_year_boundary_queues_each_month() {
            let mut f = fixture(sample());
            let visible = range(
                Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
            );
            f.controller.visible_range_changed(Some(visible));
            assert_eq!(f.controller.pending(), 3);
            f.controller.run_until_idle().await.unwrap();
            assert_eq!(
                f.controller.cache().months(),
                vec![
                    Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
                    utc(1, 1, 0),
                ]
            );
        }

        #[tokio::test]
        async fn cleared_range_does_not_queue_anything() {
            let mut f = fixture(sample());
            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            f.controller.visible_range_changed(None);
            assert_eq!(f.controller.visible_range(), None);
            assert_eq!(f.controller.stats().enqueued, 1);
            // Without a recorded range nothing is superseded.
            f.controller.run_until_idle().await.unwrap();
            assert!(f.controller.cache().contains(utc(3, 1, 0)));
        }
    }

    mod queue_policy {
        use super::*;

        #[tokio::test]
        async fn deduplicate_fetches_pending_month_once() {
            let source = sample();
            let mut f = fixture(source.clone());

            assert!(f.controller.enqueue(utc(3, 1, 0)));
            assert!(!f.controller.enqueue(utc(3, 17, 0)));
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(source.fetch_count(), 1);
            assert_eq!(f.controller.stats().deduplicated, 1);
        }

        #[tokio::test]
        async fn at_least_once_refetches_and_republishes_identically() {
            let source = sample();
            let mut f = fixture_with(
                source.clone(),
                LoaderConfig::default().with_queue_policy(QueuePolicy::AtLeastOnce),
            );

            f.controller.enqueue(utc(3, 1, 0));
            f.controller.run_until_idle().await.unwrap();
            let first = f.controller.month_days(utc(3, 1, 0)).cloned().unwrap();

            assert!(f.controller.enqueue(utc(3, 1, 0)));
            assert!(f.controller.enqueue(utc(3, 1, 0)));
            assert_eq!(f.controller.pending(), 2);
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(f.controller.month_days(utc(3, 1, 0)), Some(&first));
            assert_eq!(source.fetch_count(), 3);
            assert_eq!(f.controller.stats().published, 3);
        }
    }

    mod failures {
        use super::*;
        use monthgrid_sources::AccessStatus;

        #[tokio::test]
        async fn denied_access_publishes_empty_month() {
            let source = Arc::new(sample_source().with_access(AccessStatus::Denied));
            let mut f = fixture(source.clone());

            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            f.controller.run_until_idle().await.unwrap();

            let days = f.controller.month_days(utc(3, 1, 0)).unwrap();
            assert_eq!(days.len(), 31);
            assert!(days.values().all(Vec::is_empty));
            assert_eq!(source.fetch_count(), 0);

            // The empty month counts as loaded and is not retried.
            f.controller
                .visible_range_changed(Some(range(utc(3, 2, 0), utc(3, 9, 0))));
            assert_eq!(f.controller.pending(), 0);
            assert_eq!(f.controller.stats().enqueued, 1);
        }

        #[tokio::test]
        async fn fetch_failure_publishes_empty_month() {
            let source = Arc::new(ErrorSource::new("broken", SourceError::io("disk gone")));
            let mut f = fixture(source);

            f.controller
                .visible_range_changed(Some(range(utc(2, 1, 0), utc(2, 28, 0))));
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(
                f.controller.request_state(utc(2, 1, 0)),
                Some(RequestState::Published)
            );
            assert_eq!(f.controller.month_days(utc(2, 1, 0)).map(|d| d.len()), Some(28));
            assert_eq!(f.signals(), vec![RefreshSignal::Range(month(2))]);
        }

        #[tokio::test]
        async fn event_at_reports_out_of_range() {
            let mut f = fixture(sample());
            f.controller.enqueue(utc(3, 1, 0));
            f.controller.run_until_idle().await.unwrap();

            assert_eq!(f.controller.event_at(0, utc(3, 3, 0)).unwrap().id, "standup");
            let err = f.controller.event_at(2, utc(3, 3, 15)).unwrap_err();
            assert!(matches!(
                err,
                LoaderError::IndexOutOfRange { index: 2, count: 1, day } if day == utc(3, 3, 0)
            ));
        }
    }

    mod reload {
        use super::*;
        use monthgrid_sources::AccessStatus;

        #[tokio::test]
        async fn months_loaded_before_invalidation_are_discarded() {
            let source = sample();
            let mut f = fixture(source.clone());

            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            // Hand March to the worker.
            assert!(f.controller.process_next().await);
            assert_eq!(
                f.controller.request_state(utc(3, 1, 0)),
                Some(RequestState::Fetching)
            );

            f.controller.reload_events();
            assert_eq!(f.controller.generation(), 1);
            assert_eq!(
                f.controller.request_state(utc(3, 1, 0)),
                Some(RequestState::Queued)
            );

            f.controller.run_until_idle().await.unwrap();
            let stats = f.controller.stats();
            assert_eq!(stats.discarded, 1);
            assert_eq!(stats.published, 1);
            assert_eq!(source.fetch_count(), 2);
            assert_eq!(ids(&f.controller, utc(3, 3, 9)), vec!["standup"]);
            assert_eq!(
                f.signals(),
                vec![RefreshSignal::All, RefreshSignal::Range(month(3))]
            );
        }

        #[tokio::test]
        async fn reload_invalidates_every_month() {
            let source = sample();
            let mut f = fixture(source.clone());
            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(4, 15, 0))));
            f.controller.run_until_idle().await.unwrap();
            assert_eq!(f.controller.cache().len(), 2);

            f.controller.invalidate_all();
            assert!(f.controller.cache().is_empty());
            assert_eq!(f.controller.request_state(utc(3, 1, 0)), None);
            assert!(f.controller.events_on_day(utc(3, 3, 9)).is_empty());
        }

        #[tokio::test]
        async fn visible_calendars_filter_reloads() {
            let source = sample();
            let mut f = fixture(source.clone());
            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(4, 15, 0))));
            f.controller.run_until_idle().await.unwrap();
            assert_eq!(ids(&f.controller, utc(4, 10, 14)), vec!["dentist"]);

            f.controller
                .set_visible_calendars(Some(vec!["work".to_string()]));
            f.controller.run_until_idle().await.unwrap();

            assert!(ids(&f.controller, utc(4, 10, 14)).is_empty());
            assert_eq!(ids(&f.controller, utc(3, 3, 9)), vec!["standup"]);
            assert_eq!(f.controller.filter(), &EventFilter::only(["work"]));
            assert_eq!(source.fetch_count(), 4);
        }

        #[tokio::test]
        async fn calendar_change_supersedes_queue_and_rekeys_months() {
            let mut f = fixture(sample());
            f.controller.enqueue(utc(3, 1, 0));
            f.controller.enqueue(utc(6, 1, 0));

            let paris = ZonedCalendar::named("Europe/Paris").unwrap();
            f.controller.set_calendar(paris);
            assert_eq!(f.controller.pending(), 0);
            assert_eq!(f.controller.stats().superseded, 2);
            assert_eq!(f.controller.generation(), 1);

            f.controller
                .visible_range_changed(Some(range(utc(3, 5, 0), utc(3, 20, 0))));
            f.controller.run_until_idle().await.unwrap();
            // March 1 00:00 in Paris.
            assert_eq!(f.controller.cache().months(), vec![utc(2, 28, 23)]);
        }

        #[tokio::test]
        async fn attach_grants_access_and_reloads() {
            let source = Arc::new(sample_source().with_access(AccessStatus::NotDetermined));
            let mut f = fixture(source.clone());

            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            f.controller.run_until_idle().await.unwrap();
            assert!(f.controller.events_on_day(utc(3, 3, 9)).is_empty());

            assert_eq!(f.controller.attach().await, AccessStatus::Granted);
            f.controller.run_until_idle().await.unwrap();
            assert_eq!(ids(&f.controller, utc(3, 3, 9)), vec!["standup"]);
            assert_eq!(f.controller.generation(), 1);
        }

        #[tokio::test]
        async fn attach_denied_leaves_cache_alone() {
            let source = Arc::new(
                sample_source()
                    .with_access(AccessStatus::NotDetermined)
                    .with_grant_on_request(false),
            );
            let mut f = fixture(source);

            assert_eq!(f.controller.attach().await, AccessStatus::Denied);
            assert_eq!(f.controller.generation(), 0);
            assert!(f.signals().is_empty());
        }
    }

    mod widget {
        use super::*;

        async fn loaded_march() -> Fixture {
            let mut f = fixture(sample());
            f.controller
                .visible_range_changed(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            f.controller.run_until_idle().await.unwrap();
            f
        }

        #[tokio::test]
        async fn data_source_answers_from_cache() {
            let f = loaded_march().await;
            let day = utc(3, 30, 0);

            assert_eq!(f.controller.number_of_events(day), 1);
            assert_eq!(
                f.controller.event_range(0, day),
                Some(range(utc(3, 30, 8), utc(4, 2, 18)))
            );
            assert_eq!(f.controller.event_range(1, day), None);
            assert_eq!(
                f.controller.cell_for_event(0, day),
                EventCell::new("Offsite", Some("#1e88e5".to_string()))
            );
            assert!(f.controller.cell_for_event(4, day).is_placeholder());
            assert!(!f.controller.can_move_event(0, day));
            assert_eq!(f.controller.number_of_events(utc(5, 1, 0)), 0);
        }

        #[tokio::test]
        async fn new_event_cell_uses_default_calendar() {
            let f = loaded_march().await;
            assert_eq!(
                f.controller.cell_for_new_event(utc(3, 12, 0)),
                EventCell::new("New Event", Some("#1e88e5".to_string()))
            );
        }

        #[tokio::test]
        async fn new_event_title_is_configurable() {
            let f = fixture_with(
                sample(),
                LoaderConfig::default().with_new_event_title("Untitled"),
            );
            assert_eq!(f.controller.cell_for_new_event(utc(3, 12, 0)).title, "Untitled");
        }

        #[tokio::test]
        async fn delegate_feeds_tracker_and_records_state() {
            let mut f = fixture(sample());

            f.controller
                .did_scroll(Some(range(utc(3, 1, 0), utc(3, 31, 0))));
            assert_eq!(f.controller.pending(), 1);

            f.controller.did_show_date(utc(3, 5, 15));
            assert_eq!(f.controller.title(), Some("2025/03/05"));

            f.controller.did_select_day(utc(3, 5, 15));
            assert_eq!(f.controller.selected_day(), Some(utc(3, 5, 0)));

            f.controller.did_select_event(0, utc(3, 5, 15));
            f.controller.did_move_month(utc(4, 2, 0));
        }

        #[tokio::test]
        async fn show_date_title_uses_local_date() {
            let mut f = fixture(sample());
            f.controller
                .set_calendar(ZonedCalendar::named("Europe/Paris").unwrap());
            f.controller.did_show_date(utc(3, 31, 22) + chrono::Duration::minutes(30));
            assert_eq!(f.controller.title(), Some("2025/04/01"));
        }
    }

    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn run_loop_handles_ui_events_and_worker_messages() {
            let source = sample();
            let (tx, mut refreshes) = mpsc::unbounded_channel();
            let mut controller: CalendarController<Calendar> =
                CalendarController::new(ZonedCalendar::new(Tz::UTC), source.clone(), tx);
            let (events, rx) = mpsc::unbounded_channel();

            let task = tokio::spawn(async move {
                controller.run(rx).await;
                controller
            });

            events
                .send(UiEvent::VisibleRangeChanged(Some(range(utc(3, 1, 0), utc(3, 31, 0)))))
                .unwrap();
            assert_eq!(refreshes.recv().await, Some(RefreshSignal::Range(month(3))));

            events.send(UiEvent::ShowDate(utc(3, 5, 0))).unwrap();
            events.send(UiEvent::SelectDay(utc(3, 3, 12))).unwrap();
            events.send(UiEvent::Shutdown).unwrap();

            let controller = task.await.unwrap();
            assert_eq!(controller.title(), Some("2025/03/05"));
            assert_eq!(controller.selected_day(), Some(utc(3, 3, 0)));
            assert!(controller.cache().contains(utc(3, 1, 0)));
            controller.shutdown().await;
        }

        #[tokio::test]
        async fn run_loop_ends_when_events_close() {
            let mut f = fixture(sample());
            let (events, rx) = mpsc::unbounded_channel::<UiEvent>();
            drop(events);
            f.controller.run(rx).await;
            f.controller.shutdown().await;
        }

        #[tokio::test]
        async fn shutdown_stops_a_busy_worker() {
            let mut f = fixture(sample());
            f.controller.enqueue(utc(3, 1, 0));
            f.controller.enqueue(utc(4, 1, 0));
            f.controller.shutdown().await;
        }

        #[tokio::test]
        async fn process_pending_handles_waiting_messages() {
            let mut f = fixture(sample());
            assert_eq!(f.controller.process_pending(), 0);

            f.controller.enqueue(utc(3, 1, 0));
            let mut handled = 0;
            while handled == 0 {
                tokio::task::yield_now().await;
                handled = f.controller.process_pending();
            }
            // The worker waits for its answer before sending anything else.
            assert_eq!(handled, 1);
            assert_eq!(
                f.controller.request_state(utc(3, 1, 0)),
                Some(RequestState::Fetching)
            );
            f.controller.run_until_idle().await.unwrap();
        }

        #[test]
        fn zero_command_buffer_is_rejected() {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let _guard = runtime.enter();
            let (tx, _rx) = mpsc::unbounded_channel::<RefreshSignal>();
            let result = CalendarController::with_config(
                ZonedCalendar::new(Tz::UTC),
                sample(),
                tx,
                LoaderConfig::default().with_command_buffer(0),
            );
            assert!(matches!(result, Err(LoaderError::Config { .. })));
        }
    }
}
