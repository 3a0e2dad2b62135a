//! A widget with no screen: it only records what it was asked to redraw.

use monthgrid_core::DateRange;
use monthgrid_loader::RefreshSignal;
use tokio::sync::mpsc;
use tracing::trace;

/// Receiving end of the controller's refresh signals.
#[derive(Debug)]
pub struct HeadlessWidget {
    signals: mpsc::UnboundedReceiver<RefreshSignal>,
    refreshed: Vec<DateRange>,
    full_refreshes: usize,
}

impl HeadlessWidget {
    /// Creates the widget and the sender to hand to the controller.
    pub fn new() -> (Self, mpsc::UnboundedSender<RefreshSignal>) {
        let (sink, signals) = mpsc::unbounded_channel();
        let widget = Self {
            signals,
            refreshed: Vec::new(),
            full_refreshes: 0,
        };
        (widget, sink)
    }

    /// Consumes every pending signal. Returns how many there were.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(signal) = self.signals.try_recv() {
            trace!(?signal, "Refresh");
            match signal {
                RefreshSignal::Range(range) => self.refreshed.push(range),
                RefreshSignal::All => self.full_refreshes += 1,
            }
            count += 1;
        }
        count
    }

    /// Ranges redrawn so far, in arrival order.
    pub fn refreshed(&self) -> &[DateRange] {
        &self.refreshed
    }

    /// Number of full redraws so far.
    pub fn full_refreshes(&self) -> usize {
        self.full_refreshes
    }
}
