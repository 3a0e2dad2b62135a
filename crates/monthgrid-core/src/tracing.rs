//! Log output for monthgrid binaries and hosts.
//!
//! Every monthgrid crate logs through `tracing` macros. This module installs
//! the subscriber: a single stderr `fmt` layer in one of three
//! [`TracingOutputFormat`]s, filtered per crate.
//!
//! ```ignore
//! use monthgrid_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli_debug())?;
//! ```
//!
//! `RUST_LOG` wins over [`TracingConfig::level`]; an explicit
//! [`TracingConfig::directive`] wins over both.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Targets that receive [`TracingConfig::level`].
const TARGETS: [&str; 4] = [
    "monthgrid_core",
    "monthgrid_sources",
    "monthgrid_loader",
    "monthgrid_demo",
];

#[derive(Debug, Error)]
pub enum TracingError {
    /// A subscriber is already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("unknown log format: {0} (expected pretty, compact or json)")]
    UnknownFormat(String),
}

/// Shape of each log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingOutputFormat {
    /// Multi-line, for reading a short session.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// JSON lines.
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TracingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level of the monthgrid targets when `RUST_LOG` is unset.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Source file and line of each event.
    pub location: bool,
    pub timestamps: bool,
    /// Log span creation and close.
    pub span_events: bool,
    /// Full filter directive replacing both `level` and `RUST_LOG`.
    pub directive: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: TracingOutputFormat::Compact,
            location: false,
            timestamps: true,
            span_events: false,
            directive: None,
        }
    }
}

impl TracingConfig {
    /// `--debug`: everything from monthgrid, with locations, no timestamps.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            location: true,
            timestamps: false,
            ..Self::default()
        }
    }

    /// JSON with span events, for hosts that collect logs.
    #[must_use]
    pub fn structured() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Json,
            location: true,
            span_events: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    /// `monthgrid_core=LEVEL,monthgrid_sources=LEVEL,...`
    pub fn level_directive(&self) -> String {
        TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match self.directive {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(self.level_directive()))?),
        }
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.location)
            .with_line_number(self.location)
            .with_span_events(span_events);

        match (self.format, self.timestamps) {
            (TracingOutputFormat::Pretty, _) => base.pretty().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().boxed(),
            (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
            (TracingOutputFormat::Json, _) => base.json().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Fails if a subscriber is already set or the directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let subscriber = tracing_subscriber::registry().with(config.layer().with_filter(filter));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
