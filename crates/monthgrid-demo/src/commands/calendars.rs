//! `monthgrid calendars`: list the sub-calendars of the event source.

use chrono::Utc;

use crate::app::Demo;
use crate::config::DemoConfig;
use crate::error::DemoResult;

/// One line per sub-calendar: id, name and color. Calendars hidden by
/// `visible_calendars` are marked.
pub async fn run(config: DemoConfig) -> DemoResult<String> {
    let demo = Demo::open(config, Utc::now()).await?;
    let visible = demo.config().visible_calendars.as_ref();

    let lines: Vec<String> = demo
        .source()
        .calendars()
        .into_iter()
        .map(|calendar| {
            let hidden = visible.is_some_and(|ids| !ids.contains(&calendar.id));
            format!(
                "{:<12} {:<16} {}{}",
                calendar.id,
                calendar.name,
                calendar.color.as_deref().unwrap_or("-"),
                if hidden { "  (hidden)" } else { "" }
            )
        })
        .collect();

    if lines.is_empty() {
        return Ok(format!("{}: no calendars", demo.source().name()));
    }
    Ok(lines.join("\n"))
}
