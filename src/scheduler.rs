/// Deterministic candidate scheduler.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Candidate` to act as a
/// min-heap keyed by `(time, event_id)`. Because event IDs follow
/// declaration order and the heap is deterministic, two runs of the same
/// model with the same seed always fire the same sequence.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::binding::Binding;

/// An enabled binding waiting for global selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate(pub Binding);

/// Ordering: smallest `(time, event)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so we **reverse** the natural
/// ordering here to turn it into a min-heap.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .time
            .cmp(&self.0.time)
            .then_with(|| other.0.event.cmp(&self.0.event))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Collects one candidate per enabled event and yields them in firing
/// priority.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Candidate>,
}

impl Scheduler {
    /// Create a new, empty scheduler.
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
        }
    }

    /// Offer a binding for selection.
    pub fn push(&mut self, binding: Binding) {
        self.queue.push(Candidate(binding));
    }

    /// Pop the next candidate (earliest time, lowest event id).
    pub fn pop_next(&mut self) -> Option<Binding> {
        self.queue.pop().map(|c| c.0)
    }

    /// Forget every candidate; they are recomputed after each firing.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Drain all candidates in priority order.
    pub fn drain_ordered(&mut self) -> Vec<Binding> {
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(c) = self.queue.pop() {
            out.push(c.0);
        }
        out
    }
}
