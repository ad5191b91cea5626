//! Fixed-capacity window of recent samples
//!
//! Keeps the most recent N samples in insertion order and silently evicts
//! the oldest on overflow.

use crate::device::Sample;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use std::num::NonZeroUsize;

/// Ring buffer of the most recent samples
///
/// # Example
/// ```
/// use accelbench_core::stats::window::SampleWindow;
/// use std::num::NonZeroUsize;
///
/// let window = SampleWindow::new(NonZeroUsize::new(4).unwrap());
/// assert_eq!(window.capacity(), 4);
/// assert!(window.is_empty());
/// ```
pub struct SampleWindow {
    buffer: HeapRb<Sample>,
    capacity: NonZeroUsize,
}

impl SampleWindow {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            buffer: HeapRb::new(capacity.get()),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest if the window is full
    pub fn push(&mut self, sample: Sample) {
        if let Some(evicted) = self.buffer.push_overwrite(sample) {
            tracing::trace!(
                evicted_at_us = evicted.timestamp().as_micros() as u64,
                "window_evict"
            );
        }
    }

    /// The last `min(n, len)` samples, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Sample> + '_ {
        let skip = self.len().saturating_sub(n);
        self.buffer.iter().skip(skip)
    }

    /// All retained samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.buffer.iter()
    }

    /// Most recently pushed sample
    pub fn latest(&self) -> Option<&Sample> {
        self.recent(1).next()
    }

    /// Drop every retained sample
    pub fn clear(&mut self) {
        let dropped = Consumer::clear(&mut self.buffer);
        tracing::debug!(dropped, "window_cleared");
    }

    pub fn len(&self) -> usize {
        self.buffer.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Latencies of the retained samples in µs, oldest first
    pub fn latencies_us(&self) -> Vec<f64> {
        self.iter().map(Sample::latency_us).collect()
    }

    /// Self-reported jitter of the retained samples in µs, oldest first
    pub fn jitters_us(&self) -> Vec<f64> {
        self.iter().map(Sample::jitter_us).collect()
    }

    /// Throughput of the retained samples in MB/s, oldest first
    pub fn throughputs_mbps(&self) -> Vec<f64> {
        self.iter().map(Sample::throughput_mbps).collect()
    }
}

impl std::fmt::Debug for SampleWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleWindow")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        let capacity = NonZeroUsize::new(crate::DEFAULT_WINDOW_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity)
    }
}
