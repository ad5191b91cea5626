//! Sample capture and statistics
//!
//! [`window`] holds the rolling sample history of a session; [`engine`] holds
//! the pure functions that turn sample series into validation figures.

pub mod engine;
pub mod window;

use serde::Serialize;
use thiserror::Error;
use window::SampleWindow;

pub use engine::Summary;

/// Errors from the statistics functions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Insufficient data: need at least {required} values, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid percentile {0}: must be in (0, 100]")]
    InvalidPercentile(f64),
}

/// Summary of a session's current sample window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStatistics {
    pub sample_count: usize,
    pub avg_latency_us: f64,
    pub min_latency_us: f64,
    pub max_latency_us: f64,
    pub p99_latency_us: f64,
    /// Largest self-reported jitter in the window
    pub max_jitter_us: f64,
    /// Average latency compared to the CPU baseline
    pub speedup: f64,
}

impl WindowStatistics {
    /// Summarize every sample currently in `window`
    pub fn from_window(window: &SampleWindow, baseline_us: f64) -> Result<Self, StatsError> {
        let latencies = window.latencies_us();
        let avg = engine::mean(&latencies)?;
        Ok(Self {
            sample_count: latencies.len(),
            avg_latency_us: avg,
            min_latency_us: engine::min(&latencies)?,
            max_latency_us: engine::max(&latencies)?,
            p99_latency_us: engine::percentile(&latencies, 99.0)?,
            max_jitter_us: engine::max(&window.jitters_us())?,
            speedup: engine::speedup(avg, baseline_us)?,
        })
    }
}
