//! Pending-event queue (events that found no listener).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nsbus_core::Namespace;

/// An unhandled event waiting for a listener.
///
/// Notes:
/// - `sequence` is unique per queue and increases in emission order.
/// - Entries for the same namespace are independent of each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent<A> {
    sequence: u64,
    namespace: Namespace,
    args: A,
    queued_at: DateTime<Utc>,
}

impl<A> PendingEvent<A> {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    pub fn queued_at(&self) -> DateTime<Utc> {
        self.queued_at
    }

    pub fn into_args(self) -> A {
        self.args
    }
}

/// FIFO of [`PendingEvent`]s with an optional cap.
#[derive(Debug)]
pub struct PendingQueue<A> {
    entries: VecDeque<PendingEvent<A>>,
    next_sequence: u64,
    capacity: Option<usize>,
}

impl<A> Default for PendingQueue<A> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<A> PendingQueue<A> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingEvent<A>> {
        self.entries.iter()
    }

    /// Append an event, evicting the oldest entry if the queue is full.
    pub fn push(&mut self, namespace: Namespace, args: A) -> u64 {
        if let Some(cap) = self.capacity.map(|c| c.max(1)) {
            while self.entries.len() >= cap {
                if let Some(evicted) = self.entries.pop_front() {
                    tracing::debug!(
                        event = %evicted.namespace,
                        sequence = evicted.sequence,
                        "pending queue full, dropped oldest event"
                    );
                }
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push_back(PendingEvent {
            sequence,
            namespace,
            args,
            queued_at: Utc::now(),
        });
        sequence
    }

    /// Discard everything. Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Move every entry out, leaving the queue empty.
    pub fn take_all(&mut self) -> VecDeque<PendingEvent<A>> {
        std::mem::take(&mut self.entries)
    }

    /// Put back entries taken with [`PendingQueue::take_all`], ahead of
    /// anything queued since.
    pub fn restore(&mut self, kept: impl IntoIterator<Item = PendingEvent<A>>) {
        let newer = std::mem::take(&mut self.entries);
        self.entries.extend(kept);
        self.entries.extend(newer);
    }

    /// Drop the entries with the given sequence numbers.
    pub fn remove_sequences(&mut self, sequences: &[u64]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !sequences.contains(&e.sequence));
        before - self.entries.len()
    }

    /// Copy of the queue for delivery outside a lock.
    pub fn snapshot(&self) -> Vec<PendingEvent<A>>
    where
        A: Clone,
    {
        self.entries.iter().cloned().collect()
    }
}
