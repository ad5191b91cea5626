//! Accelbench - accelerator control plane and performance validation
//!
//! This library re-exports the device session, statistics, and validation
//! harness from `accelbench-core`, and adds the persisted application
//! configuration used by the `accelbench` binary.

pub mod config;

pub use accelbench_core::device;
pub use accelbench_core::harness;
pub use accelbench_core::stats;

pub use accelbench_core::{
    Clock, ConfigUpdate, DeviceConfig, DeviceSession, HarnessError, LcgSource, ManualClock,
    SampleWindow, SessionError, SessionState, SimulatedTransport, SystemClock, ValidationHarness,
    ValidationPlan, ValidationReport, ValidationTargets,
};
pub use accelbench_core::{BUILD_DATE, CPU_BASELINE_US, DEFAULT_WINDOW_CAPACITY, VERSION};

pub use config::AppConfig;
