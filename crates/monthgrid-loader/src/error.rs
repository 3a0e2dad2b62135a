//! Loader error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors that can occur in the loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// An event index past the end of a day's event list.
    #[error("event index {index} out of range for {day} ({count} events)")]
    IndexOutOfRange {
        index: usize,
        count: usize,
        day: DateTime<Utc>,
    },

    /// The drain worker exited while the controller still expected replies.
    #[error("month loader worker is gone")]
    WorkerGone,

    /// Invalid loader configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl LoaderError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an index out of range error.
    pub fn index_out_of_range(index: usize, count: usize, day: DateTime<Utc>) -> Self {
        Self::IndexOutOfRange { index, count, day }
    }
}
