//! Decision history.
//!
//! Bounded FIFO of the radio power changes the worker actually applied.
//! A new entry whose reason equals the most recent entry's reason replaces
//! it, so the ring never holds two consecutive entries with the same
//! reason.

use core::fmt;

use heapless::Deque;
use serde::Serialize;

use crate::policy::{Reason, Trigger};

pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub reason: Reason,
    pub trigger: Trigger,
    pub timestamp_ms: u64,
}

impl HistoryEntry {
    pub const fn new(reason: Reason, trigger: Trigger, timestamp_ms: u64) -> Self {
        Self {
            reason,
            trigger,
            timestamp_ms,
        }
    }

    fn supersedes(&self, previous: &Self) -> bool {
        self.reason == previous.reason
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms {}:{}", self.timestamp_ms, self.reason, self.trigger)
    }
}

#[derive(Debug, Clone)]
pub struct DecisionHistory<const N: usize = DEFAULT_HISTORY_CAPACITY> {
    entries: Deque<HistoryEntry, N>,
}

impl<const N: usize> Default for DecisionHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DecisionHistory<N> {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        if self.entries.back().is_some_and(|last| entry.supersedes(last)) {
            self.entries.pop_back();
        } else if self.entries.is_full() {
            self.entries.pop_front();
        }
        let _ = self.entries.push_back(entry);
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().copied().collect()
    }
}

/// Write the history section of the diagnostic dump, oldest entry first.
pub fn write_entries(
    out: &mut impl fmt::Write,
    entries: &[HistoryEntry],
    capacity: usize,
) -> fmt::Result {
    writeln!(out, "Cell Radio Power History ({}/{})", entries.len(), capacity)?;
    for entry in entries {
        writeln!(out, "  {entry}")?;
    }
    Ok(())
}
