//! Demo error types.

use monthgrid_core::{CalendarError, TracingError};
use monthgrid_loader::LoaderError;
use monthgrid_sources::SourceError;
use thiserror::Error;

/// Result type for demo operations.
pub type DemoResult<T> = Result<T, DemoError>;

/// Errors surfaced by the `monthgrid` binary.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Configuration could not be read, parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// A date argument could not be parsed.
    #[error("invalid date '{input}': expected {expected}")]
    InvalidDate {
        input: String,
        expected: &'static str,
    },

    /// The event source refused access.
    #[error("access to {0} was not granted")]
    AccessDenied(String),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("event source error: {0}")]
    Source(#[from] SourceError),

    #[error("loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Tracing(#[from] TracingError),
}

impl DemoError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn invalid_date(input: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidDate {
            input: input.into(),
            expected,
        }
    }
}
