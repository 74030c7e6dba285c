//! Bounded history of recent per-frame measurements.

use serde::Serialize;
use std::collections::VecDeque;

use crate::stats;

/// Three parallel ring buffers of recent counts, density scores, and
/// timestamps (epoch seconds). All three always have identical length;
/// index `i` across them refers to the same frame. Oldest samples are
/// evicted first once capacity is reached.
#[derive(Debug)]
pub struct HistoryStore {
    counts: VecDeque<f64>,
    densities: VecDeque<f64>,
    timestamps: VecDeque<f64>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            counts: VecDeque::with_capacity(capacity),
            densities: VecDeque::with_capacity(capacity),
            timestamps: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, count: f64, density: f64, timestamp: f64) {
        self.counts.push_back(count);
        self.densities.push_back(density);
        self.timestamps.push_back(timestamp);
        while self.counts.len() > self.capacity {
            self.counts.pop_front();
            self.densities.pop_front();
            self.timestamps.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count of the frame before the most recent one, if any.
    pub fn previous_count(&self) -> Option<f64> {
        if self.counts.len() < 2 {
            return None;
        }
        self.counts.get(self.counts.len() - 2).copied()
    }

    pub fn tail_counts(&self, n: usize) -> Vec<f64> {
        Self::tail(&self.counts, n)
    }

    pub fn tail_densities(&self, n: usize) -> Vec<f64> {
        Self::tail(&self.densities, n)
    }

    pub fn tail_timestamps(&self, n: usize) -> Vec<f64> {
        Self::tail(&self.timestamps, n)
    }

    fn tail(buf: &VecDeque<f64>, n: usize) -> Vec<f64> {
        let skip = buf.len().saturating_sub(n);
        buf.iter().skip(skip).copied().collect()
    }

    pub fn summary(&self) -> HistorySummary {
        let counts: Vec<f64> = self.counts.iter().copied().collect();
        let densities: Vec<f64> = self.densities.iter().copied().collect();
        let (min_count, max_count) = if counts.is_empty() {
            (0.0, 0.0)
        } else {
            (
                counts.iter().copied().fold(f64::INFINITY, f64::min),
                counts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };
        HistorySummary {
            samples: counts.len(),
            current_count: counts.last().copied().unwrap_or(0.0),
            avg_count: stats::mean(&counts),
            max_count,
            min_count,
            current_density: densities.last().copied().unwrap_or(0.0),
            avg_density: stats::mean(&densities),
        }
    }
}

/// Aggregate statistics over the retained history window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistorySummary {
    pub samples: usize,
    pub current_count: f64,
    pub avg_count: f64,
    pub max_count: f64,
    pub min_count: f64,
    pub current_density: f64,
    pub avg_density: f64,
}
