//! Bounded, most-recent-first history of outcomes.

use std::collections::VecDeque;

use crate::outcome::Outcome;

/// Default number of rows kept.
pub const DEFAULT_TRACE_CAPACITY: usize = 10;

/// Most-recent-first ring of [`Outcome`]s.
///
/// A batch is inserted as a unit: its first element becomes the head of the
/// trace and the rest follow in order, then the oldest rows beyond the
/// capacity are dropped.
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    entries: VecDeque<Outcome>,
    capacity: usize,
}

impl TraceBuffer {
    /// Empty buffer with the given capacity (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 2),
            capacity,
        }
    }

    /// Insert one outcome at the head.
    pub fn record(&mut self, outcome: Outcome) {
        self.record_batch([outcome]);
    }

    /// Insert a batch so that its first element ends up at the head.
    pub fn record_batch<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = Outcome>,
        I::IntoIter: DoubleEndedIterator,
    {
        for outcome in batch.into_iter().rev() {
            self.entries.push_front(outcome);
        }
        self.entries.truncate(self.capacity);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.entries.iter()
    }

    /// Owned copy of the entries, newest first.
    pub fn snapshot(&self) -> Vec<Outcome> {
        self.entries.iter().cloned().collect()
    }

    /// Newest entry.
    pub fn latest(&self) -> Option<&Outcome> {
        self.entries.front()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRACE_CAPACITY)
    }
}
