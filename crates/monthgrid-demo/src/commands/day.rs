//! `monthgrid day`: list the events of a single day.

use monthgrid_core::DateRange;
use monthgrid_loader::CalendarDelegate;
use tracing::debug;

use crate::app::Demo;
use crate::commands::parse_day;
use crate::config::DemoConfig;
use crate::error::DemoResult;
use crate::render::render_day;

/// Lists the events of `date` (`YYYY-MM-DD`).
///
/// Only the month containing the day is loaded.
pub async fn run(config: DemoConfig, date: &str) -> DemoResult<String> {
    let calendar = config.calendar()?;
    let day = parse_day(&calendar, date)?;

    let demo = Demo::open(config, day).await?;
    let (mut controller, mut widget) = demo.controller().await?;
    controller.did_scroll(Some(DateRange::day(demo.calendar(), day)));
    controller.run_until_idle().await?;
    controller.did_select_day(day);
    let refreshed = widget.drain();
    debug!(refreshed, day = %day, "Day ready");

    let out = render_day(&controller, demo.calendar(), day);
    controller.shutdown().await;
    Ok(out)
}
