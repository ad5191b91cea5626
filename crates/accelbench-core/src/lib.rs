//! Accelbench Core - Device session, sample capture, and performance validation
//!
//! This library drives a host-attached hardware accelerator through its
//! lifecycle (connect, configure, stream, disconnect), captures a bounded
//! window of performance samples, and scores latency, jitter, and throughput
//! against fixed validation targets.

pub mod device;
pub mod harness;
pub mod stats;

pub use device::clock::{Clock, ManualClock, SystemClock};
pub use device::session::{DeviceSession, SessionState};
pub use device::simulated::SimulatedTransport;
pub use device::source::{ConstantSource, LcgSource};
pub use device::{ConfigUpdate, DeviceConfig, Sample, SessionError, Transport};
pub use harness::{HarnessError, ValidationHarness, ValidationPlan, ValidationReport, ValidationTargets};
pub use stats::window::SampleWindow;
pub use stats::StatsError;

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Date this crate was built (set by build.rs)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Default number of samples retained by a session's window
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// CPU-only reference latency used for speedup figures (µs)
pub const CPU_BASELINE_US: f64 = 150.0;
