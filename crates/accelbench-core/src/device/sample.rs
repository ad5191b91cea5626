//! Performance samples
//!
//! A [`Sample`] is one measured or synthesized observation of the device.
//! Samples are created only by a session and cannot be modified afterwards.

use serde::Serialize;
use std::time::Duration;

/// Health of one device subsystem at sample time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Active,
    Idle,
    Error,
}

/// Per-subsystem status captured with a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubsystemStatus {
    /// Host link (PCIe or equivalent)
    pub transport: ComponentStatus,
    /// DMA engine
    pub dma: ComponentStatus,
    /// Compute kernel
    pub compute: ComponentStatus,
}

impl SubsystemStatus {
    /// All subsystems active
    pub const fn active() -> Self {
        Self {
            transport: ComponentStatus::Active,
            dma: ComponentStatus::Active,
            compute: ComponentStatus::Active,
        }
    }

    /// True when no subsystem reports an error
    pub fn is_healthy(&self) -> bool {
        ![self.transport, self.dma, self.compute].contains(&ComponentStatus::Error)
    }
}

/// One performance observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    timestamp: Duration,
    latency: Duration,
    throughput_mbps: f64,
    jitter: Duration,
    status: SubsystemStatus,
}

impl Sample {
    pub(crate) fn new(
        timestamp: Duration,
        latency: Duration,
        throughput_mbps: f64,
        jitter: Duration,
        status: SubsystemStatus,
    ) -> Self {
        Self {
            timestamp,
            latency,
            throughput_mbps,
            jitter,
            status,
        }
    }

    /// Monotonic capture time, relative to the session clock origin
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Latency in microseconds
    pub fn latency_us(&self) -> f64 {
        self.latency.as_secs_f64() * 1e6
    }

    /// Throughput in MB/s
    pub fn throughput_mbps(&self) -> f64 {
        self.throughput_mbps
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Jitter in microseconds
    pub fn jitter_us(&self) -> f64 {
        self.jitter.as_secs_f64() * 1e6
    }

    pub fn status(&self) -> SubsystemStatus {
        self.status
    }
}

/// Convert a microsecond figure to a `Duration` rounded to the nanosecond,
/// flooring negatives at zero
pub(crate) fn micros(us: f64) -> Duration {
    if us.is_finite() && us > 0.0 {
        Duration::from_nanos((us * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_accessors() {
        let sample = Sample::new(
            Duration::from_millis(10),
            Duration::from_micros(55),
            1000.0,
            Duration::from_micros(2),
            SubsystemStatus::active(),
        );
        assert_eq!(sample.timestamp(), Duration::from_millis(10));
        assert_relative_eq!(sample.latency_us(), 55.0, epsilon = 1e-9);
        assert_relative_eq!(sample.jitter_us(), 2.0, epsilon = 1e-9);
        assert_eq!(sample.throughput_mbps(), 1000.0);
        assert!(sample.status().is_healthy());
    }

    #[test]
    fn test_status_health() {
        let status = SubsystemStatus {
            dma: ComponentStatus::Error,
            ..SubsystemStatus::active()
        };
        assert!(!status.is_healthy());

        let idle = SubsystemStatus {
            compute: ComponentStatus::Idle,
            ..SubsystemStatus::active()
        };
        assert!(idle.is_healthy());
    }

    #[test]
    fn test_micros_floors_negative() {
        assert_eq!(micros(-3.0), Duration::ZERO);
        assert_eq!(micros(f64::NAN), Duration::ZERO);
        assert_eq!(micros(12.0), Duration::from_micros(12));
    }
}
