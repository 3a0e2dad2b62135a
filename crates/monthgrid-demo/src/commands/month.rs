//! `monthgrid month`: scroll through one or more month grids.

use chrono::Utc;
use monthgrid_core::CalendarSystem;
use monthgrid_loader::CalendarDelegate;
use tracing::{debug, info};

use crate::app::Demo;
use crate::commands::parse_month;
use crate::config::DemoConfig;
use crate::error::DemoResult;
use crate::render::{month_grid, render_month};

/// Renders `count` consecutive months starting at `month` (`YYYY-MM`, or
/// the current month).
///
/// Each month is scrolled into view the way a widget would report it: the
/// grid's visible weeks reach into the neighbouring months, which are
/// loaded too.
pub async fn run(config: DemoConfig, month: Option<&str>, count: u32) -> DemoResult<String> {
    let calendar = config.calendar()?;
    let first = match month {
        Some(input) => parse_month(&calendar, input)?,
        None => calendar.start_of_month(Utc::now()),
    };

    let demo = Demo::open(config, first).await?;
    let (mut controller, mut widget) = demo.controller().await?;

    let mut pages = Vec::new();
    let mut current = first;
    for _ in 0..count.max(1) {
        controller.did_show_date(current);
        controller.did_scroll(Some(month_grid(demo.calendar(), current)));
        controller.run_until_idle().await?;

        let refreshed = widget.drain();
        debug!(
            title = controller.title().unwrap_or_default(),
            refreshed,
            "Month ready"
        );
        pages.push(render_month(&controller, demo.calendar(), current));
        current = demo.calendar().start_of_next_month(current);
    }

    info!(stats = ?controller.stats(), "Loader finished");
    controller.shutdown().await;
    Ok(pages.join("\n\n"))
}
