//! Bounded history of observation timestamps for one candidate.

use std::collections::VecDeque;

/// Fixed-capacity FIFO of observation times.
///
/// Once `capacity` observations have been pushed the buffer is full and stays
/// full; older timestamps fall off the front.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceBuffer {
    timestamps: VecDeque<f64>,
    capacity: usize,
}

impl EvidenceBuffer {
    /// A zero capacity is raised to 1 so a single sighting can confirm.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            timestamps: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, timestamp: f64) {
        if self.timestamps.len() == self.capacity {
            self.timestamps.pop_front();
        }
        self.timestamps.push_back(timestamp);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.timestamps.len() >= self.capacity
    }

    pub fn oldest(&self) -> Option<f64> {
        self.timestamps.front().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.timestamps.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.timestamps.iter().copied()
    }
}
