//! Rolling sample history for the live graph
//!
//! The graph keeps the last [`GRAPH_CAPACITY`] accepted samples. At one
//! reading per second (slow mode) that is two minutes of history, twelve
//! seconds in fast mode.

use crate::config::GraphConfig;
use crate::types::Sample;
use std::collections::VecDeque;

/// Number of samples retained by the graph
pub const GRAPH_CAPACITY: usize = 120;

/// Receiver of accepted samples
pub trait GraphSink {
    /// Push one new sample
    fn update(&mut self, value: Sample);
}

/// Fixed-capacity FIFO of samples, oldest dropped first
#[derive(Debug, Clone, PartialEq)]
pub struct RollingBuffer {
    values: VecDeque<Sample>,
    capacity: usize,
}

impl RollingBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push a value, evicting the oldest one when full
    pub fn push(&mut self, value: Sample) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.values.iter()
    }

    /// Most recent value
    pub fn latest(&self) -> Option<Sample> {
        self.values.back().copied()
    }

    /// Minimum and maximum of the retained values
    pub fn min_max(&self) -> Option<(Sample, Sample)> {
        self.values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl Default for RollingBuffer {
    fn default() -> Self {
        Self::new(GRAPH_CAPACITY)
    }
}

impl GraphSink for RollingBuffer {
    fn update(&mut self, value: Sample) {
        self.push(value);
    }
}

/// Graph model: sample history plus axis options
#[derive(Debug, Clone, Default)]
pub struct FrequencyGraph {
    buffer: RollingBuffer,
    pub options: GraphConfig,
}

impl FrequencyGraph {
    pub fn new(options: GraphConfig) -> Self {
        Self {
            buffer: RollingBuffer::default(),
            options,
        }
    }

    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Points for plotting, x = sample index
    ///
    /// Right-aligned so the newest sample is always at `GRAPH_CAPACITY - 1`.
    /// With a logarithmic axis the y value is `log10(Hz)` and non-positive
    /// samples are skipped.
    pub fn plot_points(&self) -> Vec<[f64; 2]> {
        let offset = self.buffer.capacity() - self.buffer.len();
        self.buffer
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| {
                let x = (offset + i) as f64;
                if self.options.log_y {
                    (v > 0.0).then(|| [x, v.log10()])
                } else {
                    Some([x, v])
                }
            })
            .collect()
    }
}

impl GraphSink for FrequencyGraph {
    fn update(&mut self, value: Sample) {
        self.buffer.push(value);
    }
}
