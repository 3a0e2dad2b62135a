//! Background drain worker.
//!
//! The worker owns no loader state. It is woken through a bounded command
//! channel and, for every iteration, asks the controller for the next
//! request over the message channel. The controller answers from its own
//! context, which is where the queue is popped and visibility re-checked.
//! The worker then fetches, buckets and hands the day map back.
//!
//! ```text
//!  controller                         MonthLoader
//!      │ ── Wake ──────────────────────────▶ │
//!      │ ◀──────────── NextRequest{reply} ── │
//!      │ ── Some(LoadRequest) ─────────────▶ │ fetch_events + bucket
//!      │ ◀──────────────── Loaded(month) ─── │
//!      │ ◀──────────── NextRequest{reply} ── │
//!      │ ── None ──────────────────────────▶ │ idle until next Wake
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use monthgrid_core::{CalendarSystem, DateRange};
use monthgrid_sources::{EventFilter, EventSource};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bucket::bucket_events;
use crate::cache::DayMap;

/// Commands that can be sent to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderCommand {
    /// Drain the queue until the controller has nothing left.
    Wake,
    /// Exit the worker loop.
    Stop,
}

/// One month to fetch, as handed out by the controller.
#[derive(Debug, Clone)]
pub struct LoadRequest<C> {
    /// Month start (cache key).
    pub month: DateTime<Utc>,
    /// `[month, start of next month)`.
    pub range: DateRange,
    /// Calendar used to bucket days.
    pub calendar: C,
    /// Sub-calendars to include.
    pub filter: EventFilter,
    /// Cache generation the request was issued under.
    pub generation: u64,
}

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The source returned this many events.
    Fetched { events: usize },
    /// The permission gate is closed; the month is empty.
    AccessDenied,
    /// The source failed; the month is empty.
    Failed { message: String },
}

/// A fetched and bucketed month.
#[derive(Debug)]
pub struct LoadedMonth {
    /// Month start (cache key).
    pub month: DateTime<Utc>,
    /// The fetched window.
    pub range: DateRange,
    /// Events per day.
    pub days: DayMap,
    /// Generation copied from the request.
    pub generation: u64,
    /// How the fetch ended.
    pub outcome: FetchOutcome,
}

/// Messages from the worker to the controller.
#[derive(Debug)]
pub enum WorkerMessage<C> {
    /// Asks for the next request; `None` means the queue is drained.
    NextRequest {
        reply: oneshot::Sender<Option<LoadRequest<C>>>,
    },
    /// A month is ready to publish.
    Loaded(LoadedMonth),
}

/// The single worker fetching months one at a time.
pub struct MonthLoader<C> {
    source: Arc<dyn EventSource>,
    commands: mpsc::Receiver<LoaderCommand>,
    owner: mpsc::UnboundedSender<WorkerMessage<C>>,
}

impl<C: CalendarSystem> MonthLoader<C> {
    /// Creates a worker reading `commands` and reporting to `owner`.
    pub fn new(
        source: Arc<dyn EventSource>,
        commands: mpsc::Receiver<LoaderCommand>,
        owner: mpsc::UnboundedSender<WorkerMessage<C>>,
    ) -> Self {
        Self {
            source,
            commands,
            owner,
        }
    }

    /// Spawns the worker loop on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until `Stop`, until the command channel closes or until the
    /// controller stops answering.
    pub async fn run(mut self) {
        info!(source = self.source.name(), "Month loader started");

        while let Some(command) = self.commands.recv().await {
            match command {
                LoaderCommand::Wake => {
                    if !self.drain().await {
                        debug!("Controller gone");
                        break;
                    }
                }
                LoaderCommand::Stop => break,
            }
        }

        info!("Month loader stopping");
    }

    /// Processes requests until the controller answers `None`.
    ///
    /// Returns false when the controller side is closed.
    async fn drain(&mut self) -> bool {
        loop {
            let (reply, answer) = oneshot::channel();
            if self
                .owner
                .send(WorkerMessage::NextRequest { reply })
                .is_err()
            {
                return false;
            }

            let request = match answer.await {
                Ok(Some(request)) => request,
                Ok(None) => return true,
                Err(_) => return false,
            };

            let loaded = self.load(request).await;
            if self.owner.send(WorkerMessage::Loaded(loaded)).is_err() {
                return false;
            }
        }
    }

    async fn load(&self, request: LoadRequest<C>) -> LoadedMonth {
        let LoadRequest {
            month,
            range,
            calendar,
            filter,
            generation,
        } = request;

        let status = self.source.access_status();
        let (events, outcome) = if !status.is_granted() {
            debug!(month = %month, ?status, "Access not granted, loading empty month");
            (Vec::new(), FetchOutcome::AccessDenied)
        } else {
            match self.source.fetch_events(range, filter).await {
                Ok(events) => {
                    let count = events.len();
                    (events, FetchOutcome::Fetched { events: count })
                }
                Err(e) if e.is_access_denied() => {
                    debug!(month = %month, error = %e, "Access denied during fetch");
                    (Vec::new(), FetchOutcome::AccessDenied)
                }
                Err(e) => {
                    warn!(month = %month, error = %e, "Fetch failed, loading empty month");
                    (
                        Vec::new(),
                        FetchOutcome::Failed {
                            message: e.to_string(),
                        },
                    )
                }
            }
        };

        let days = bucket_events(&calendar, &range, events);
        debug!(month = %month, generation, ?outcome, "Loaded month");

        LoadedMonth {
            month,
            range,
            days,
            generation,
            outcome,
        }
    }
}
