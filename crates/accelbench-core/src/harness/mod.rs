//! Performance validation harness
//!
//! Drives a connected [`DeviceSession`](crate::DeviceSession) through the
//! latency, jitter, and throughput tests and scores the results against
//! [`ValidationTargets`].

pub mod plan;
pub mod report;
pub mod runner;

use crate::device::SessionError;
use crate::stats::StatsError;
use thiserror::Error;

pub use plan::{ValidationPlan, ValidationTargets};
pub use report::{TargetVerdict, TestResult, TestStatus, ValidationReport};
pub use runner::ValidationHarness;

/// Errors raised while running validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarnessError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    #[error("Invalid validation plan: {0}")]
    InvalidPlan(String),

    #[error("Validation cancelled during {test} test")]
    Cancelled { test: &'static str },
}

impl HarnessError {
    /// Whether the test could not be scored for lack of data, as opposed
    /// to the device or run failing
    pub fn is_prerequisite(&self) -> bool {
        matches!(self, Self::Stats(_))
    }
}
