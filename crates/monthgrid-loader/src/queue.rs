//! FIFO queue of month starts awaiting fetch.

use std::collections::{HashSet, VecDeque};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// How the queue treats a month that is already pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Drop the new entry; the pending one keeps its position.
    #[default]
    Deduplicate,
    /// Append every entry, re-fetching duplicates in FIFO order.
    AtLeastOnce,
}

impl QueuePolicy {
    /// Returns a stable snake_case name for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deduplicate => "deduplicate",
            Self::AtLeastOnce => "at_least_once",
        }
    }
}

impl FromStr for QueuePolicy {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "deduplicate" | "dedup" => Ok(Self::Deduplicate),
            "at_least_once" => Ok(Self::AtLeastOnce),
            other => Err(LoaderError::config(format!(
                "unknown queue policy: {} (expected deduplicate or at_least_once)",
                other
            ))),
        }
    }
}

/// Pending load requests, keyed by month start.
#[derive(Debug, Default)]
pub struct LoadQueue {
    policy: QueuePolicy,
    entries: VecDeque<DateTime<Utc>>,
    pending: HashSet<DateTime<Utc>>,
}

impl LoadQueue {
    /// Creates an empty queue.
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            policy,
            entries: VecDeque::new(),
            pending: HashSet::new(),
        }
    }

    /// The duplicate policy.
    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// Appends `month` to the tail.
    ///
    /// Returns `false` when the month was dropped as a duplicate.
    pub fn push(&mut self, month: DateTime<Utc>) -> bool {
        if self.policy == QueuePolicy::Deduplicate && !self.pending.insert(month) {
            return false;
        }
        self.entries.push_back(month);
        true
    }

    /// Removes and returns the head of the queue.
    pub fn pop(&mut self) -> Option<DateTime<Utc>> {
        let month = self.entries.pop_front()?;
        if self.policy == QueuePolicy::Deduplicate {
            self.pending.remove(&month);
        }
        Some(month)
    }

    /// Returns true if `month` is waiting in the queue.
    pub fn contains(&self, month: DateTime<Utc>) -> bool {
        match self.policy {
            QueuePolicy::Deduplicate => self.pending.contains(&month),
            QueuePolicy::AtLeastOnce => self.entries.contains(&month),
        }
    }

    /// Removes every entry, returning them in queue order.
    pub fn clear(&mut self) -> Vec<DateTime<Utc>> {
        self.pending.clear();
        self.entries.drain(..).collect()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries, head first.
    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.entries.iter()
    }
}
