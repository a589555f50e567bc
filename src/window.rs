//! Fixed-capacity history windows
//!
//! Every raw channel and derived feature is buffered in a [`HistoryWindow`]:
//! a FIFO that grows until it reaches capacity and then evicts the oldest
//! sample on every push. Consumers must treat the contents as not-ready
//! until the window is full.

use std::collections::VecDeque;

/// Ordered buffer of the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one once the window is full.
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// True once the window holds `capacity` samples ("warmed").
    pub fn is_ready(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Contents in chronological order.
    ///
    /// The per-second pipeline recomputes over the full window each call, so
    /// one contiguous copy per second is the simplest correct access path.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// The most recent `count` samples in chronological order.
    /// Returns `None` until at least `count` samples are present.
    pub fn tail(&self, count: usize) -> Option<Vec<f64>> {
        if self.samples.len() < count {
            return None;
        }
        Some(
            self.samples
                .iter()
                .skip(self.samples.len() - count)
                .copied()
                .collect(),
        )
    }

    /// Arithmetic mean over whatever has accumulated; `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Drop all samples; the window warms up again from empty.
    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
