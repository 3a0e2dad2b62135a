//! Wiring of calendar, event source and controller for one demo run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use monthgrid_core::ZonedCalendar;
use monthgrid_loader::CalendarController;
#[cfg(feature = "ics")]
use monthgrid_sources::IcsSource;
use monthgrid_sources::EventSource;
use tracing::{info, warn};

use crate::config::DemoConfig;
use crate::error::{DemoError, DemoResult};
use crate::headless::HeadlessWidget;
use crate::sample::sample_source;

/// Calendar used by the demo.
pub type DemoCalendar = ZonedCalendar<Tz>;

/// Controller type driven by the demo.
pub type DemoController = CalendarController<DemoCalendar>;

/// Everything a command needs to build a controller.
pub struct Demo {
    config: DemoConfig,
    calendar: DemoCalendar,
    source: Arc<dyn EventSource>,
}

impl Demo {
    /// Opens the configured event source. Without an `.ics` file the
    /// built-in sample is generated around `around`.
    pub async fn open(config: DemoConfig, around: DateTime<Utc>) -> DemoResult<Self> {
        let calendar = config.calendar()?;
        let source: Arc<dyn EventSource> = match config.ics {
            #[cfg(feature = "ics")]
            Some(ref path) => Arc::new(IcsSource::load(path, *calendar.timezone()).await?),
            #[cfg(not(feature = "ics"))]
            Some(_) => {
                return Err(DemoError::config(
                    "this build has no iCalendar support (feature \"ics\")",
                ));
            }
            None => Arc::new(sample_source(&calendar, around)),
        };
        info!(source = source.name(), calendar = ?calendar.timezone(), "Demo source opened");
        Ok(Self::with_source(config, calendar, source))
    }

    /// Uses an already opened source.
    pub fn with_source(
        config: DemoConfig,
        calendar: DemoCalendar,
        source: Arc<dyn EventSource>,
    ) -> Self {
        Self {
            config,
            calendar,
            source,
        }
    }

    pub fn calendar(&self) -> &DemoCalendar {
        &self.calendar
    }

    pub fn source(&self) -> &Arc<dyn EventSource> {
        &self.source
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    /// Builds an attached controller and the headless widget it refreshes.
    ///
    /// # Errors
    ///
    /// Fails on an invalid loader configuration or a closed permission gate.
    pub async fn controller(&self) -> DemoResult<(DemoController, HeadlessWidget)> {
        let (widget, sink) = HeadlessWidget::new();
        let mut controller = CalendarController::with_config(
            self.calendar.clone(),
            Arc::clone(&self.source),
            sink,
            self.config.loader.clone(),
        )?;

        let status = controller.attach().await;
        if !status.is_granted() {
            warn!(source = self.source.name(), ?status, "Access to events not granted");
            controller.shutdown().await;
            return Err(DemoError::AccessDenied(self.source.name().to_string()));
        }
        if let Some(ref ids) = self.config.visible_calendars {
            controller.set_visible_calendars(Some(ids.clone()));
        }
        Ok((controller, widget))
    }
}
