//! Timer queue for scheduled resumptions
//!
//! Delayed steps (the ignition delay, the burn duration, spark cooldowns) are
//! not blocking code: each one is a small event pushed onto a [`Scheduler`]
//! with the simulated time it is due. Owners drain due events every step.
//!
//! Events due at the same instant come out in the order they were scheduled.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Min-heap of events keyed by due time (seconds of simulated time)
#[derive(Debug)]
pub struct Scheduler<E> {
    queue: BinaryHeap<Reverse<Wake<E>>>,
    next_seq: u64,
}

#[derive(Debug)]
struct Wake<E> {
    due: f64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Wake<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Wake<E> {}

impl<E> PartialOrd for Wake<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Wake<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .total_cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    /// Create an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `event` to fire at simulated time `due`
    pub fn schedule(&mut self, due: f64, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Wake { due, seq, event }));
    }

    /// Pop the earliest event if it is due at or before `now`.
    ///
    /// Returns the event together with the time it was scheduled for, so
    /// follow-up wakes can be chained off the exact due time rather than the
    /// (possibly later) step time.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, E)> {
        if self.queue.peek()?.0.due > now {
            return None;
        }
        self.queue.pop().map(|Reverse(wake)| (wake.due, wake.event))
    }

    /// Due time of the earliest pending event
    #[must_use]
    pub fn next_due(&self) -> Option<f64> {
        self.queue.peek().map(|wake| wake.0.due)
    }

    /// Number of pending events
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
