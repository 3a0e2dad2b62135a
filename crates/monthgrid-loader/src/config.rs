//! Loader configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};
use crate::queue::QueuePolicy;

/// Title given to the seed cell of a user-created event.
pub const DEFAULT_NEW_EVENT_TITLE: &str = "New Event";

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Duplicate handling in the load queue.
    pub queue_policy: QueuePolicy,

    /// Capacity of the worker's command channel. Wakes beyond it coalesce.
    pub command_buffer: usize,

    /// Title of the cell returned for a new event.
    pub new_event_title: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            queue_policy: QueuePolicy::Deduplicate,
            command_buffer: 1,
            new_event_title: DEFAULT_NEW_EVENT_TITLE.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Builder: set the queue policy.
    pub fn with_queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }

    /// Builder: set the command channel capacity.
    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }

    /// Builder: set the new-event title.
    pub fn with_new_event_title(mut self, title: impl Into<String>) -> Self {
        self.new_event_title = title.into();
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Fails when the command buffer is zero (tokio channels need at least
    /// one slot).
    pub fn validate(&self) -> LoaderResult<()> {
        if self.command_buffer == 0 {
            return Err(LoaderError::config("command_buffer must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default() {
        let config = LoaderConfig::default();
        assert_eq!(config.queue_policy, QueuePolicy::Deduplicate);
        assert_eq!(config.command_buffer, 1);
        assert_eq!(config.new_event_title, "New Event");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder() {
        let config = LoaderConfig::default()
            .with_queue_policy(QueuePolicy::AtLeastOnce)
            .with_command_buffer(4)
            .with_new_event_title("Untitled");
        assert_eq!(config.queue_policy, QueuePolicy::AtLeastOnce);
        assert_eq!(config.command_buffer, 4);
        assert_eq!(config.new_event_title, "Untitled");
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let err = LoaderConfig::default()
            .with_command_buffer(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, LoaderError::Config { .. }));
    }
}
